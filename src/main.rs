#[tokio::main]
async fn main() {
    if let Err(e) = tcm_clinic_lib::run().await {
        eprintln!("tcm-clinic: {e}");
        std::process::exit(1);
    }
}
