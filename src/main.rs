use std::process::ExitCode;

fn main() -> ExitCode {
    restsuite::cli::run()
}
