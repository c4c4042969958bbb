use dialoguer::{theme::ColorfulTheme, Confirm};
use pbs_onboarding::{
    reconcile, render_delete, render_insert, FsBucket, PendingChanges, ReconcileOutcome,
    SqliteAllowlistDb,
};

use crate::cli::args::OnboardArgs;
use crate::exit_codes;

pub fn run(args: OnboardArgs) -> anyhow::Result<i32> {
    let bucket = FsBucket::new(&args.bucket_dir);
    let mut db = SqliteAllowlistDb::open(&args.db, &args.table)?;
    let theme = ColorfulTheme::default();

    let result = reconcile(
        &bucket,
        &args.state_file_name,
        &args.desired_csv,
        &mut db,
        |pending| {
            print_plan(&args.table, pending);
            if args.yes {
                return true;
            }
            Confirm::with_theme(&theme)
                .with_prompt("Confirm these actions?")
                .default(false)
                .interact()
                .unwrap_or(false)
        },
    );

    match result {
        Ok(ReconcileOutcome::NothingToDo) => {
            eprintln!("Nothing to do.");
            Ok(exit_codes::SUCCESS)
        }
        Ok(ReconcileOutcome::Declined) => {
            eprintln!("Will not proceed.");
            Ok(exit_codes::SUCCESS)
        }
        Ok(ReconcileOutcome::Applied { removed, added }) => {
            eprintln!(
                "Done. Removed {} row(s), added {} row(s).",
                removed, added
            );
            Ok(exit_codes::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Exiting...");
            Ok(exit_codes::CONFIG_ERROR)
        }
    }
}

fn print_plan(table: &str, pending: PendingChanges<'_>) {
    let plan = pending.plan;
    if !plan.removals.is_empty() {
        println!("\nThe following items will be REMOVED:");
        for line in &plan.removals {
            println!("{}", line);
        }
    }
    if !plan.additions.is_empty() {
        println!("\nThe following items will be ADDED:");
        for line in &plan.additions {
            println!("{}", line);
        }
    }

    let statements = [
        render_delete(table, pending.removals),
        render_insert(table, pending.additions),
    ];
    let statements: Vec<String> = statements.into_iter().flatten().collect();
    if !statements.is_empty() {
        println!("\nStatements to be executed:");
        for statement in statements {
            println!("{}", statement);
        }
    }
    println!();
}
