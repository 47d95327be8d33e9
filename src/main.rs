fn main() {
    if let Err(err) = trip_explorer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
