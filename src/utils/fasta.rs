use crate::utils::Result;
use bio::io::fasta;
use std::{fs::File, io::Read, path::Path};

/// One protein sequence from a FASTA file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

pub fn read_fasta(path: &Path) -> Result<Vec<SequenceRecord>> {
    let file =
        File::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    parse_fasta(file).map_err(|e| format!("Invalid FASTA {}: {}", path.display(), e))
}

fn parse_fasta<R: Read>(reader: R) -> Result<Vec<SequenceRecord>> {
    let mut records = Vec::new();
    for (index, record) in fasta::Reader::new(reader).records().enumerate() {
        let record = record.map_err(|e| format!("record {}: {}", index + 1, e))?;
        if record.id().is_empty() {
            return Err(format!("record {}: header without identifier", index + 1));
        }
        records.push(SequenceRecord {
            id: record.id().to_string(),
            sequence: record.seq().to_vec(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn parse_multiline_records() {
        let input = ">sp|P05453|ERF3 Eukaryotic peptide chain release factor\nMSDSNQGNNQ\nQNYQQYSQNG\n>second\nMKV\n";
        let records = parse_fasta(Cursor::new(input)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "sp|P05453|ERF3");
        assert_eq!(records[0].sequence, b"MSDSNQGNNQQNYQQYSQNG".to_vec());
        assert_eq!(records[1].len(), 3);
    }

    #[test]
    fn parse_empty_input() {
        let records = parse_fasta(Cursor::new("")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn sequence_before_header_is_an_error() {
        let err = parse_fasta(Cursor::new("MKV\n>late\nMKV\n")).unwrap_err();
        assert!(err.starts_with("record 1:"), "{err}");
    }

    #[test]
    fn header_without_id_is_an_error() {
        let err = parse_fasta(Cursor::new(">\nMKV\n")).unwrap_err();
        assert!(err.starts_with("record 1:"), "{err}");
    }

    #[test]
    fn read_fasta_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">Sup35\nMSDSNQGNNQQNYQQYSQNGNQQQGNNRYQGYQAYNAQAQPAGGYYQNYQGYSGYQQGGYQQYNPDAGYQQQYNPQGGYQQYNPQGGYQQQFNPQGGRGNYKNFNYNNNLQGYQAGFQPQSQGMSLNDFQKQQKQAAPKPKKTLKLVSSSGIKLANATKKVGTKPAESDKKEEEKSAETKEPTKEPTKVEEPVKKEEKPVQTEEKTEEKSELPKVEDLKISESTHNTNNANVTSADALIKEQEEEVDDEVVND").unwrap();
        let records = read_fasta(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "Sup35");
    }

    #[test]
    fn read_fasta_reports_path_on_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not a fasta file").unwrap();
        let err = read_fasta(file.path()).unwrap_err();
        assert!(err.starts_with("Invalid FASTA"), "{err}");
    }

    #[test]
    fn read_fasta_missing_file() {
        let err = read_fasta(Path::new("/no/such/file.fasta")).unwrap_err();
        assert!(err.starts_with("Failed to open /no/such/file.fasta"), "{err}");
    }
}
