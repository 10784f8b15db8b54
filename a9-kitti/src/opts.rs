use a9_kitti::{CategoryFilter, CategoryMap, ConvertConfig, FileFormat, Mode, SplitPrefix};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Convert A9 datasets into the KITTI layout")]
pub enum Opts {
    Convert(Convert),
    Info(Info),
    Dump(Dump),
}

/// Print the schema of a `.pcd` file.
#[derive(Debug, Clone, Parser)]
pub struct Info {
    pub file: PathBuf,
}

/// Print the records of a `.pcd`, KITTI `.bin` or KITTI label file.
#[derive(Debug, Clone, Parser)]
pub struct Dump {
    #[clap(short, long)]
    pub format: Option<FileFormat>,

    pub input: PathBuf,
}

/// Convert an A9 dataset into the KITTI layout.
#[derive(Debug, Clone, Parser)]
pub struct Convert {
    /// Directory holding one subdirectory per recording session.
    pub load_dir: PathBuf,

    /// Root of the KITTI output tree.
    pub save_dir: PathBuf,

    #[clap(short, long, value_enum, default_value = "point-cloud")]
    pub mode: Mode,

    /// Split prefix: 0 for training, 1 for validation, 2 for testing.
    #[clap(short, long, value_enum, default_value = "0")]
    pub prefix: SplitPrefix,

    #[clap(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    /// Skip labels, as test splits carry no ground truth.
    #[clap(long)]
    pub test_mode: bool,

    /// Categories to keep. Every category is kept when empty.
    #[clap(long, value_delimiter = ',')]
    pub classes: Vec<String>,

    /// Rename a category, given as SRC=DST.
    #[clap(long, value_parser = parse_class_mapping)]
    pub class_map: Vec<(String, String)>,

    /// Also write every label line to label_all/<prefix>.txt.
    #[clap(long)]
    pub label_all: bool,
}

impl From<Convert> for ConvertConfig {
    fn from(args: Convert) -> Self {
        let Convert {
            load_dir,
            save_dir,
            mode,
            prefix,
            workers,
            test_mode,
            classes,
            class_map,
            label_all,
        } = args;

        Self {
            load_dir,
            save_dir,
            mode,
            prefix,
            workers: workers as usize,
            test_mode,
            filter: classes.into_iter().collect::<CategoryFilter>(),
            class_map: class_map.into_iter().collect::<CategoryMap>(),
            label_all,
        }
    }
}

fn parse_class_mapping(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_string(), to.to_string()))
        }
        _ => Err(format!("invalid class mapping '{text}', expect SRC=DST")),
    }
}
