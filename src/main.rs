fn main() -> Result<(), Box<dyn std::error::Error>> {
    berrychat::cli::main()
}
