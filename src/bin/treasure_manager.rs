fn main() {
    std::process::exit(treasure_hunt::cli::manager::run_cli());
}
