fn main() {
    if let Err(err) = sld_renderer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
