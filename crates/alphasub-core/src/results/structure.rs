use super::error::{PdbParseErrorKind, ResultsError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Last column needed from an ATOM record (the B-factor ends at 66).
const MIN_ATOM_LINE_LEN: usize = 66;

#[derive(Debug, Clone, PartialEq)]
pub struct ChainSummary {
    pub id: char,
    pub residues: usize,
    pub atoms: usize,
    /// Mean B-factor of the CA atoms; AlphaFold writes per-residue pLDDT there.
    pub mean_plddt: Option<f64>,
}

/// What a text front-end shows of a predicted model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructureSummary {
    pub chains: Vec<ChainSummary>,
}

impl StructureSummary {
    pub fn residues(&self) -> usize {
        self.chains.iter().map(|c| c.residues).sum()
    }

    pub fn atoms(&self) -> usize {
        self.chains.iter().map(|c| c.atoms).sum()
    }

    /// Mean pLDDT over every residue of every chain.
    pub fn mean_plddt(&self) -> Option<f64> {
        let (sum, count) = self
            .chains
            .iter()
            .filter_map(|c| c.mean_plddt.map(|m| (m * c.residues as f64, c.residues)))
            .fold((0.0, 0usize), |(s, n), (m, r)| (s + m, n + r));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn read(path: &Path) -> Result<Self, ResultsError> {
        let file = File::open(path).map_err(ResultsError::io(path))?;
        Self::read_from(BufReader::new(file)).map_err(|err| match err {
            ReadError::Io(source) => ResultsError::Io {
                path: path.to_path_buf(),
                source,
            },
            ReadError::Parse { line, kind } => ResultsError::Pdb {
                path: path.to_path_buf(),
                line,
                kind,
            },
        })
    }

    pub fn read_from(reader: impl BufRead) -> Result<Self, ReadError> {
        let mut builder = SummaryBuilder::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(ReadError::Io)?;
            let line_num = index + 1;
            match slice_and_trim(&line, 0, 6) {
                "ATOM" | "HETATM" => builder
                    .add_atom(&line)
                    .map_err(|kind| ReadError::Parse {
                        line: line_num,
                        kind,
                    })?,
                "ENDMDL" => break,
                _ => {}
            }
        }
        Ok(builder.finish())
    }
}

#[derive(Debug)]
pub enum ReadError {
    Io(std::io::Error),
    Parse { line: usize, kind: PdbParseErrorKind },
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

#[derive(Default)]
struct ChainAccumulator {
    id: char,
    residues: usize,
    atoms: usize,
    ca_bfactor_sum: f64,
    ca_count: usize,
    last_residue: Option<(i32, char)>,
}

impl ChainAccumulator {
    fn finish(self) -> ChainSummary {
        ChainSummary {
            id: self.id,
            residues: self.residues,
            atoms: self.atoms,
            mean_plddt: (self.ca_count > 0).then(|| self.ca_bfactor_sum / self.ca_count as f64),
        }
    }
}

#[derive(Default)]
struct SummaryBuilder {
    done: Vec<ChainSummary>,
    current: Option<ChainAccumulator>,
}

impl SummaryBuilder {
    fn add_atom(&mut self, line: &str) -> Result<(), PdbParseErrorKind> {
        if line.len() < MIN_ATOM_LINE_LEN {
            return Err(PdbParseErrorKind::LineTooShort {
                required: MIN_ATOM_LINE_LEN,
            });
        }
        let atom_name = slice_and_trim(line, 12, 16);
        let chain_id = line
            .get(21..22)
            .and_then(|s| s.chars().next())
            .filter(|c| *c != ' ')
            .unwrap_or('A');
        let res_seq_str = slice_and_trim(line, 22, 26);
        let res_seq: i32 = res_seq_str
            .parse()
            .map_err(|_| PdbParseErrorKind::InvalidInt {
                columns: "23-26",
                value: res_seq_str.to_string(),
            })?;
        let insertion = line
            .get(26..27)
            .and_then(|s| s.chars().next())
            .unwrap_or(' ');
        let bfactor_str = slice_and_trim(line, 60, 66);
        let bfactor: f64 = bfactor_str
            .parse()
            .map_err(|_| PdbParseErrorKind::InvalidFloat {
                columns: "61-66",
                value: bfactor_str.to_string(),
            })?;

        if self.current.as_ref().is_none_or(|c| c.id != chain_id) {
            if let Some(previous) = self.current.take() {
                self.done.push(previous.finish());
            }
            self.current = Some(ChainAccumulator {
                id: chain_id,
                ..ChainAccumulator::default()
            });
        }
        let Some(chain) = self.current.as_mut() else {
            return Ok(());
        };
        chain.atoms += 1;
        if chain.last_residue != Some((res_seq, insertion)) {
            chain.residues += 1;
            chain.last_residue = Some((res_seq, insertion));
        }
        if atom_name == "CA" {
            chain.ca_bfactor_sum += bfactor;
            chain.ca_count += 1;
        }
        Ok(())
    }

    fn finish(mut self) -> StructureSummary {
        if let Some(chain) = self.current.take() {
            self.done.push(chain.finish());
        }
        StructureSummary { chains: self.done }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MODEL: &str = "\
MODEL     1
ATOM      1  N   MET A   1     -11.208  -3.472  11.393  1.00 80.50           N
ATOM      2  CA  MET A   1     -10.166  -3.226  10.399  1.00 82.00           C
ATOM      3  C   MET A   1      -9.018  -4.222  10.509  1.00 82.00           C
ATOM      4  CA  LYS A   2      -7.511  -4.722   9.812  1.00 90.00           C
TER       5      LYS A   2
ATOM      6  CA  GLY B   1       1.000   2.000   3.000  1.00 50.00           C
ATOM      7  CA  GLY B   1A      1.500   2.500   3.500  1.00 60.00           C
ENDMDL
MODEL     2
ATOM      8  CA  GLY C   1       1.000   2.000   3.000  1.00 10.00           C
ENDMDL
END
";

    #[test]
    fn chains_residues_and_plddt_are_summarized() {
        let summary = StructureSummary::read_from(Cursor::new(MODEL)).unwrap();

        assert_eq!(summary.chains.len(), 2);
        let a = &summary.chains[0];
        assert_eq!((a.id, a.residues, a.atoms), ('A', 2, 4));
        assert_eq!(a.mean_plddt, Some(86.0));
        let b = &summary.chains[1];
        assert_eq!((b.id, b.residues, b.atoms), ('B', 2, 2));
        assert_eq!(b.mean_plddt, Some(55.0));

        assert_eq!(summary.residues(), 4);
        assert_eq!(summary.atoms(), 6);
        assert_eq!(summary.mean_plddt(), Some(70.5));
    }

    #[test]
    fn short_atom_record_reports_the_line() {
        let text = "ATOM      1  CA  MET A   1     -10.166  -3.226\n";
        match StructureSummary::read_from(Cursor::new(text)) {
            Err(ReadError::Parse { line, kind }) => {
                assert_eq!(line, 1);
                assert_eq!(kind, PdbParseErrorKind::LineTooShort { required: 66 });
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn bad_bfactor_is_a_parse_error() {
        let text = "REMARK\nATOM      1  CA  MET A   1     -10.166  -3.226  10.399  1.00 abcdef           C\n";
        match StructureSummary::read_from(Cursor::new(text)) {
            Err(ReadError::Parse { line, kind }) => {
                assert_eq!(line, 2);
                assert!(matches!(kind, PdbParseErrorKind::InvalidFloat { columns: "61-66", .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error_with_path() {
        let err = StructureSummary::read(Path::new("/nonexistent/model.pdb")).unwrap_err();
        assert!(matches!(err, ResultsError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/model.pdb"));
    }
}
