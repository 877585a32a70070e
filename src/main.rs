use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    liunian::cli::main()
}
