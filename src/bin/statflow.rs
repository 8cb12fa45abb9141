fn main() -> Result<(), Box<dyn std::error::Error>> {
    statflow::main()
}
