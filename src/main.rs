use std::process::ExitCode;

fn main() -> ExitCode {
    orderload::entry::run()
}
