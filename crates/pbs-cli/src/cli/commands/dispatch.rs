use super::super::args::*;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Authorize(args) => super::authorize::run(args).await,
        Command::Onboard(args) => super::onboard::run(args),
        Command::Heartbeat(args) => super::heartbeat::run(args).await,
        Command::Db(args) => match args.cmd {
            DbSub::Init(init_args) => super::db::cmd_db_init(init_args),
        },
    }
}
