fn main() {
    if let Err(err) = convo_renderer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
