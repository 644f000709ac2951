//! Loading engine inputs from disk.

use crate::error::{IoError, Result};
use crate::serialization::sequence_from_hex;
use protocell_core::{Feedback, HardwareConfig, InstSet};
use protocell_data::{Instruction, Sequence};
use std::path::Path;

/// An instruction set together with the diagnostics produced while
/// loading it.
#[derive(Debug, Clone)]
pub struct LoadedInstSet {
    pub inst_set: InstSet,
    pub feedback: Feedback,
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| IoError::from(e).with_context(format!("reading {}", path.display())))
}

/// Loads an instruction-set description. Lines with errors are skipped and
/// reported in the returned feedback; only a set with no usable entries
/// fails outright.
pub fn load_inst_set<P: AsRef<Path>>(path: P) -> Result<LoadedInstSet> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let mut feedback = Feedback::new();
    let inst_set = InstSet::from_description(&text, &mut feedback)
        .map_err(|e| IoError::from(e).with_context(format!("loading {}", path.display())))?;
    tracing::debug!(
        path = %path.display(),
        instructions = inst_set.len(),
        diagnostics = feedback.entries().len(),
        "instruction set loaded"
    );
    Ok(LoadedInstSet { inst_set, feedback })
}

/// Loads a genome file: one instruction name per line, or instruction
/// bytes as hex when the file has a `.hex` extension.
pub fn load_genome<P: AsRef<Path>>(path: P, inst_set: &InstSet) -> Result<Sequence> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let genome = if path.extension().is_some_and(|ext| ext == "hex") {
        sequence_from_hex(&text, inst_set.len())
    } else {
        inst_set.parse_sequence(&text).map_err(IoError::from)
    }
    .map_err(|e| e.with_context(format!("loading {}", path.display())))?;
    if genome.is_empty() {
        return Err(IoError::validation(format!("{} holds no instructions", path.display())));
    }
    Ok(genome)
}

/// Writes a genome in the same format `load_genome` reads.
pub fn save_genome<P: AsRef<Path>>(path: P, inst_set: &InstSet, genome: &[Instruction]) -> Result<()> {
    std::fs::write(path, inst_set.format_sequence(genome))?;
    Ok(())
}

/// Loads and validates a TOML hardware configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HardwareConfig> {
    let path = path.as_ref();
    let text = read_text(path)?;
    HardwareConfig::from_toml(&text)
        .map_err(|e| IoError::config(e.to_string()).with_context(format!("loading {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("protocell_io_{}_{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_inst_set_reports_warnings() {
        let path = temp_file("set.cfg", "INST nop-A\nINST nop-B\nFOO bar\nINST inc\n");
        let loaded = load_inst_set(&path).unwrap();
        assert_eq!(loaded.inst_set.len(), 3);
        assert_eq!(loaded.inst_set.num_nops(), 2);
        assert_eq!(loaded.feedback.warnings().count(), 1);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_genome_file_roundtrip() {
        let set_path = temp_file("rt.cfg", "INST nop-A\nINST inc\nINST dec\n");
        let set = load_inst_set(&set_path).unwrap().inst_set;
        let genome = vec![Instruction(1), Instruction(2), Instruction(0)];
        let path = std::env::temp_dir().join(format!("protocell_io_{}_rt.org", std::process::id()));
        save_genome(&path, &set, &genome).unwrap();
        assert_eq!(load_genome(&path, &set).unwrap(), genome);
        std::fs::remove_file(path).ok();
        std::fs::remove_file(set_path).ok();
    }

    #[test]
    fn test_hex_genome_file() {
        let set_path = temp_file("hex.cfg", "INST nop-A\nINST inc\nINST dec\n");
        let set = load_inst_set(&set_path).unwrap().inst_set;
        let path = temp_file("genome.hex", "010200\n");
        assert_eq!(
            load_genome(&path, &set).unwrap(),
            vec![Instruction(1), Instruction(2), Instruction(0)]
        );
        std::fs::write(&path, "0103").unwrap();
        let err = load_genome(&path, &set).unwrap_err();
        assert!(err.to_string().contains("genome.hex"));
        std::fs::remove_file(path).ok();
        std::fs::remove_file(set_path).ok();
    }

    #[test]
    fn test_unknown_genome_name_fails() {
        let set_path = temp_file("unk.cfg", "INST nop-A\nINST inc\n");
        let set = load_inst_set(&set_path).unwrap().inst_set;
        let path = temp_file("unk.org", "inc\nh-divide\n");
        let err = load_genome(&path, &set).unwrap_err();
        assert!(err.to_string().contains("h-divide"));
        std::fs::remove_file(path).ok();
        std::fs::remove_file(set_path).ok();
    }

    #[test]
    fn test_comment_only_genome_is_rejected() {
        let set_path = temp_file("empty.cfg", "INST nop-A\n");
        let set = load_inst_set(&set_path).unwrap().inst_set;
        let path = temp_file("empty.org", "# nothing here\n\n");
        assert!(matches!(load_genome(&path, &set), Err(IoError::Validation(_))));
        std::fs::remove_file(path).ok();
        std::fs::remove_file(set_path).ok();
    }

    #[test]
    fn test_load_config_validates() {
        let path = temp_file("bad.toml", "[execution]\nmax_threads = 0\n");
        assert!(load_config(&path).is_err());
        std::fs::remove_file(path).ok();

        let path = temp_file("good.toml", "[execution]\nmax_threads = 2\n");
        assert_eq!(load_config(&path).unwrap().execution.max_threads, 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_config("/nonexistent/protocell.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/protocell.toml"));
    }
}
