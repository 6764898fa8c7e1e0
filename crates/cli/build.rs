use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("portada")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Portada Contributors")
        .about("Render branded graphics from news links, images and videos")
        .arg(clap::arg!(--link <URL> "News article URL; renders one graphic per edition"))
        .arg(
            clap::arg!(--image <FILE> "Image file to process with the caption")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--video <FILE> "Video file to process with the caption")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .group(clap::ArgGroup::new("input").required(true).args(["link", "image", "video"]))
        .arg(clap::arg!(-c --caption <TEXT> "Caption selecting the effect (logo, watermark, big <text>, recorte, blur, or free text)"))
        .arg(clap::arg!(-e --effect <MODE> "Only render link editions whose mode matches (e.g. recorte, blur)"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file")
                .default_value("output.jpg")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--editions_dir <DIR> "Directory holding edition JSON files")
                .long("editions-dir")
                .default_value("configs/articulo7/editions")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--defaults <FILE> "Defaults configuration file")
                .default_value("configs/defaults.json")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--settings <FILE> "Settings file merged over the defaults")
                .default_value("configs/settings.json")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--log <FILTER> "Log filter used when RUST_LOG is unset").default_value("warn"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("15"))
        .arg(clap::arg!(--insecure "Skip TLS certificate verification when fetching links"))
        .arg(clap::arg!(-v --verbose "Print progress and timings"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "portada", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "portada", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "portada", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "portada", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
