#![forbid(unsafe_code)]

use gmad::gma;
use inquire::{Confirm, CustomType, Text};
use std::path::{Path, PathBuf};

fn prompt_err(e: inquire::InquireError) -> gma::GmaError {
    gma::GmaError::Prompt(e.to_string())
}

fn ensure_gma_ext(p: &Path) -> PathBuf {
    if p.extension().and_then(|e| e.to_str()).unwrap_or("") == "gma" {
        return p.to_path_buf();
    }
    let mut s = p.to_string_lossy().to_string();
    if !s.ends_with('.') {
        s.push('.');
    }
    s.push_str("gma");
    PathBuf::from(s)
}

pub fn run() -> gma::GmaResult<()> {
    println!("GMA Wizard\n");

    let input = Text::new("Addon directory")
        .with_default("./addon")
        .prompt()
        .map(PathBuf::from)
        .map_err(prompt_err)?;

    let output_raw = Text::new("Output .gma file")
        .with_default("./addon.gma")
        .prompt()
        .map_err(prompt_err)?;
    let output = ensure_gma_ext(Path::new(&output_raw));

    let name = Text::new("Title").prompt().map_err(prompt_err)?;
    let description = Text::new("Description (optional)")
        .with_default("")
        .prompt()
        .map_err(prompt_err)?;
    let author = Text::new("Author (optional)")
        .with_default("")
        .prompt()
        .map_err(prompt_err)?;
    let steam_id = CustomType::<u64>::new("Author SteamID64")
        .with_default(0)
        .prompt()
        .map_err(prompt_err)?;

    let files = gma::scan_directory(&input)?;
    if files.is_empty() {
        println!("\nNo packable files under {}.", input.display());
        return Ok(());
    }

    let compute_crc = Confirm::new("Record CRC32 for each file?")
        .with_default(false)
        .prompt()
        .map_err(prompt_err)?;

    println!("\nBuild summary:");
    println!("  input   : {}", input.display());
    println!("  output  : {}", output.display());
    println!("  title   : {name}");
    println!("  author  : {}", if author.is_empty() { "<none>" } else { &author });
    println!("  files   : {}", files.len());
    println!("  crc     : {compute_crc}");

    let proceed = Confirm::new("Proceed?")
        .with_default(true)
        .prompt()
        .map_err(prompt_err)?;
    if !proceed {
        return Ok(());
    }

    let opts = gma::BuildOptions {
        name,
        description,
        author,
        steam_id,
        compute_crc,
        ..Default::default()
    };
    let n = gma::build(&input, &output, &opts)?;
    println!("packed {n} files into {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gma_extension_is_appended_once() {
        assert_eq!(ensure_gma_ext(Path::new("out.gma")), PathBuf::from("out.gma"));
        assert_eq!(ensure_gma_ext(Path::new("out")), PathBuf::from("out.gma"));
        assert_eq!(ensure_gma_ext(Path::new("out.")), PathBuf::from("out.gma"));
    }
}
