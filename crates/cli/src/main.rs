use std::process::ExitCode;

fn main() -> ExitCode {
    agora_cli::run()
}
