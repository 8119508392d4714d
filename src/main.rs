fn main() -> Result<(), Box<dyn std::error::Error>> {
    jiuding::cli::main()
}
