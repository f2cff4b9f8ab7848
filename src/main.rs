fn main() {
    let matches = modbustool::cli::parse_args();
    modbustool::cli::init_logging(matches.get_flag("verbose"));
    std::process::exit(modbustool::cli::actions::run(&matches));
}
