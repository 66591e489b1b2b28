fn main() {
    std::process::exit(treasure_hunt::cli::hub::run_cli());
}
