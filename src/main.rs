use std::process::ExitCode;

fn main() -> ExitCode {
    ocr_relay::init_tracing();

    match ocr_relay::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
