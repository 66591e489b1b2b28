fn main() {
    std::process::exit(treasure_hunt::cli::score::run_cli());
}
