use std::process::ExitCode;

fn main() -> ExitCode {
    abasto_cli::run()
}
