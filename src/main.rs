use clap::Parser;
use stordb::cli::commands::{add, backup, delete, get, import_cmd, init, list, update, vault_cmd};
use stordb::cli::{output, Action, Cli};
use stordb::config::Settings;
use stordb::errors::Result;
use stordb::store::LookupField;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        output::error(&e.to_string());
        tracing::error!("{} failed: {e}", cli.action().map(|a| a.flag()).unwrap_or("command"));
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    stordb::logging::init(cli.debug, &settings.log_file)?;

    let action = cli.action()?;
    tracing::info!("UI ACTION: {}", action.flag());

    match &action {
        Action::Init => init::execute(cli, &settings),
        Action::Add {
            mac,
            name,
            owner,
            description,
        } => add::execute(cli, &settings, mac, name, owner, description),
        Action::Lookup(mac) => get::execute(cli, &settings, mac),
        Action::Owner(owner) => list::execute(cli, &settings, Some((LookupField::Owner, owner))),
        Action::Device(name) => {
            list::execute(cli, &settings, Some((LookupField::DeviceName, name)))
        }
        Action::List => list::execute(cli, &settings, None),
        Action::Update { id, changes } => update::execute(cli, &settings, *id, changes),
        Action::Delete(id) => delete::execute(cli, &settings, *id),
        Action::ImportCsv(path) => {
            import_cmd::execute(cli, &settings, path, import_cmd::Format::Csv)
        }
        Action::ImportJson(path) => {
            import_cmd::execute(cli, &settings, path, import_cmd::Format::Json)
        }
        Action::ExportVault(path) => vault_cmd::export(cli, &settings, path.as_deref()),
        Action::ImportVault(path) => vault_cmd::import(cli, &settings, path.as_deref()),
        Action::BackupDb(path) => backup::backup(cli, &settings, path.as_deref()),
        Action::RestoreDb(path) => backup::restore(cli, &settings, path),
    }
}
