//! Generate Kotlin (or Python) bindings from the compiled library.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "generate-bindings")]
#[command(about = "Generate UniFFI bindings for iapkit-mobile")]
struct Cli {
    /// Path to the compiled library (.so, .dylib or .a file)
    #[arg(long, default_value = "../target/release/libiapkit_mobile.so")]
    library: Utf8PathBuf,

    /// Output language
    #[arg(short = 'l', long = "language", default_value = "kotlin")]
    language: Language,

    /// Output directory
    #[arg(short = 'o', long = "out-dir")]
    out_dir: Option<Utf8PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Language {
    Kotlin,
    Python,
}

fn main() -> anyhow::Result<()> {
    use uniffi_bindgen::bindings::{KotlinBindingGenerator, PythonBindingGenerator};
    use uniffi_bindgen::library_mode::generate_bindings;

    let cli = Cli::parse();

    let out_dir = cli.out_dir.unwrap_or_else(|| match cli.language {
        Language::Kotlin => Utf8PathBuf::from("kotlin/generated"),
        Language::Python => Utf8PathBuf::from("python/generated"),
    });
    std::fs::create_dir_all(&out_dir)?;

    if !cli.library.exists() {
        anyhow::bail!("Library not found: {}", cli.library);
    }

    println!("Library: {}", cli.library);
    println!("Output: {}", out_dir);

    match cli.language {
        Language::Kotlin => {
            generate_bindings(
                &cli.library,
                None,
                &KotlinBindingGenerator,
                &uniffi_bindgen::EmptyCrateConfigSupplier,
                None,
                &out_dir,
                false,
            )?;
        }
        Language::Python => {
            generate_bindings(
                &cli.library,
                None,
                &PythonBindingGenerator,
                &uniffi_bindgen::EmptyCrateConfigSupplier,
                None,
                &out_dir,
                false,
            )?;
        }
    }

    println!("Bindings generated");
    Ok(())
}
