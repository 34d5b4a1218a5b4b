use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = wipefree::Cli::parse();
    let exit_code = wipefree::run_cli(cli);
    std::process::exit(exit_code);
}
