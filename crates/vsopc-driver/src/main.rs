fn main() {
    vsopc_driver::init_logging();
    let args: Vec<String> = std::env::args().collect();
    match vsopc_driver::run(&args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("vsopc: {err:#}");
            std::process::exit(1);
        }
    }
}
