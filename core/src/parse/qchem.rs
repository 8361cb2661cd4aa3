use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    geometry::Geometry,
    label::{AtomLabels, LabelValue, Labels},
    molecule::MoleculeSet,
    periodic_table,
};

use super::ParseOutcome;

/// Length of one Bohr in Angstrom.
pub const BOHR_TO_ANGSTROM: f64 = 0.529177208590000;

const MOLECULE: &str = "$molecule";
const REM: &str = "$rem";
const ORIENTATION: &str = "Standard Nuclear Orientation";
const SCF_CONVERGED: &str = "Convergence criterion met";
const GRADIENT: &str = "Gradient of SCF Energy";
const DIPOLE: &str = "Dipole Moment (Debye)";
const QUADRUPOLE: &str = "Quadrupole Moments (Debye-Ang)";
const MULLIKEN: &str = "Ground-State Mulliken Net Atomic Charges";
const OPT_CONVERGED: &str = "OPTIMIZATION CONVERGED";

/// Which frames of a log become geometries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryMode {
    /// the final frame of every converged optimization
    #[default]
    Converged,
    /// every complete frame of the log
    AllFrames,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QchemOptions {
    pub mode: TrajectoryMode,
    /// used when `$rem` has no `method` entry
    pub default_method: String,
    /// used when `$rem` has no `basis` entry
    pub default_basis: String,
}

impl Default for QchemOptions {
    fn default() -> Self {
        Self {
            mode: TrajectoryMode::default(),
            default_method: "unknown".to_owned(),
            default_basis: "unknown".to_owned(),
        }
    }
}

/// How many values of each property had been read at some point of the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCounts {
    pub coordinates: usize,
    pub energies: usize,
    pub forces: usize,
    pub dipoles: usize,
    pub quadrupoles: usize,
    pub charges: usize,
}

impl FrameCounts {
    fn all(&self) -> [usize; 6] {
        [
            self.coordinates,
            self.energies,
            self.forces,
            self.dipoles,
            self.quadrupoles,
            self.charges,
        ]
    }

    /// The shared count if every property was read equally often.
    pub fn complete(&self) -> Option<usize> {
        let [first, rest @ ..] = self.all();
        (first > 0 && rest.iter().all(|&count| count == first)).then_some(first)
    }
}

/// Everything extracted from one Q-Chem log, before it is turned into a
/// [`MoleculeSet`].
#[derive(Clone, Debug, Default)]
pub struct QchemLog {
    pub n_atoms: Option<usize>,
    pub charge: Option<i32>,
    pub multiplicity: Option<u32>,
    pub method: Option<String>,
    pub basis: Option<String>,
    pub atomic_numbers: Vec<Vec<u32>>,
    pub coordinates: Vec<Vec<Vector3<f64>>>,
    pub energies: Vec<f64>,
    /// forces in Hartree/Angstrom (negated, converted gradients)
    pub forces: Vec<Vec<[f64; 3]>>,
    pub dipoles: Vec<[f64; 3]>,
    /// `[XX, XY, YY, XZ, YZ, ZZ]`
    pub quadrupoles: Vec<[f64; 6]>,
    pub charges: Vec<Vec<f64>>,
    /// property counts at every `OPTIMIZATION CONVERGED` marker, with its line
    pub converged: Vec<(usize, FrameCounts)>,
    /// set when the log ended in the middle of a block
    pub truncated: Option<&'static str>,
    pub lines: usize,
}

/// Parse a log file. The `source` identifier is set to the file stem.
pub fn parse_file(path: impl AsRef<Path>, options: &QchemOptions) -> ParseOutcome {
    let path = path.as_ref();
    log::info!("reading {}", path.display());

    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => return ParseOutcome::Failed(err.into()),
    };

    let mut outcome = parse(BufReader::new(file), options);
    if let (Some(mset), Some(stem)) = (outcome.molecule_set_mut(), path.file_stem()) {
        mset.set_identifier("source", stem.to_string_lossy().into_owned());
    }
    outcome
}

pub fn parse(reader: impl BufRead, options: &QchemOptions) -> ParseOutcome {
    match QchemLog::read(reader) {
        Ok(parsed) => parsed.build(options),
        Err(err) => ParseOutcome::Failed(err),
    }
}

struct Cursor<'a> {
    lines: &'a [String],
    position: usize,
}

impl<'a> Cursor<'a> {
    /// Next line and its 1-based line number.
    fn advance(&mut self) -> Option<(usize, &'a str)> {
        let line = self.lines.get(self.position)?;
        self.position += 1;
        Some((self.position, line.as_str()))
    }

    fn expect(&mut self, marker: &'static str) -> Result<(usize, &'a str)> {
        self.advance().ok_or(Error::Truncated { marker })
    }

    fn skip(&mut self, n: usize, marker: &'static str) -> Result<()> {
        for _ in 0..n {
            self.expect(marker)?;
        }
        Ok(())
    }
}

/// Splits a line into fields, also splitting numbers that were printed without
/// a separating space (`0.123-0.456`).
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    for token in line.split_whitespace() {
        let mut start = 0;
        let bytes = token.as_bytes();
        for i in 1..bytes.len() {
            if bytes[i] == b'-' && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.') {
                fields.push(&token[start..i]);
                start = i;
            }
        }
        fields.push(&token[start..]);
    }
    fields
}

fn field<'f>(fields: &[&'f str], index: usize, line: usize) -> Result<&'f str> {
    fields
        .get(index)
        .copied()
        .ok_or_else(|| Error::parse(line, format!("missing field {index}")))
}

fn float(fields: &[&str], index: usize, line: usize) -> Result<f64> {
    let raw = field(fields, index, line)?;
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(Error::parse(line, format!("'{raw}' is not a finite number"))),
        Err(_) => Err(Error::parse(line, format!("'{raw}' is not a number"))),
    }
}

fn is_rule(line: &str) -> bool {
    line.trim_start().starts_with("---")
}

impl QchemLog {
    /// Read a whole log. Running out of lines inside a block is not an error:
    /// it is recorded in [`QchemLog::truncated`] and everything read before
    /// is kept.
    pub fn read(reader: impl BufRead) -> Result<Self> {
        let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
        let mut parsed = Self {
            lines: lines.len(),
            ..Self::default()
        };

        let mut cursor = Cursor {
            lines: &lines,
            position: 0,
        };
        match parsed.read_markers(&mut cursor) {
            Ok(()) => {}
            Err(Error::Truncated { marker }) => {
                log::warn!("log ended inside the '{marker}' block");
                parsed.truncated = Some(marker);
            }
            Err(err) => return Err(err),
        }

        log::debug!(
            "read {} frames, {} energies, {} gradients, {} converged optimizations",
            parsed.coordinates.len(),
            parsed.energies.len(),
            parsed.forces.len(),
            parsed.converged.len()
        );
        Ok(parsed)
    }

    fn read_markers(&mut self, cursor: &mut Cursor) -> Result<()> {
        while let Some((line_no, line)) = cursor.advance() {
            let trimmed = line.trim_start();
            if trimmed.starts_with(MOLECULE) {
                self.read_molecule(cursor)?;
            } else if trimmed.starts_with(REM) {
                self.read_rem(cursor)?;
            } else if line.contains(ORIENTATION) {
                self.read_orientation(cursor)?;
            } else if line.contains(SCF_CONVERGED) {
                let fields = split_fields(line);
                self.energies.push(float(&fields, 1, line_no)?);
            } else if line.contains(GRADIENT) {
                let n_atoms = self.frame_atoms(line_no)?;
                self.read_gradient(cursor, n_atoms)?;
            } else if line.contains(DIPOLE) {
                let (line_no, line) = cursor.expect(DIPOLE)?;
                let fields = split_fields(line);
                self.dipoles.push([
                    float(&fields, 1, line_no)?,
                    float(&fields, 3, line_no)?,
                    float(&fields, 5, line_no)?,
                ]);
            } else if line.contains(QUADRUPOLE) {
                let mut quadrupole = [0.0; 6];
                for row in quadrupole.chunks_mut(3) {
                    let (line_no, line) = cursor.expect(QUADRUPOLE)?;
                    let fields = split_fields(line);
                    for (i, value) in row.iter_mut().enumerate() {
                        *value = float(&fields, 1 + 2 * i, line_no)?;
                    }
                }
                self.quadrupoles.push(quadrupole);
            } else if line.contains(MULLIKEN) {
                let n_atoms = self.frame_atoms(line_no)?;
                cursor.skip(3, MULLIKEN)?;
                let mut charges = Vec::with_capacity(n_atoms);
                for _ in 0..n_atoms {
                    let (line_no, line) = cursor.expect(MULLIKEN)?;
                    let fields = split_fields(line);
                    charges.push(float(&fields, fields.len().saturating_sub(1), line_no)?);
                }
                self.charges.push(charges);
            } else if line.contains(OPT_CONVERGED) {
                log::debug!("optimization converged at line {line_no}");
                self.converged.push((line_no, self.counts()));
            }
        }
        Ok(())
    }

    fn read_molecule(&mut self, cursor: &mut Cursor) -> Result<()> {
        let (line_no, first) = cursor.expect(MOLECULE)?;
        if first.trim().eq_ignore_ascii_case("read") {
            while !cursor.expect(MOLECULE)?.1.contains("$end") {}
            return Ok(());
        }

        let fields = split_fields(first);
        let charge = field(&fields, 0, line_no)?
            .parse::<i32>()
            .map_err(|_| Error::parse(line_no, "invalid molecular charge"))?;
        let multiplicity = field(&fields, 1, line_no)?
            .parse::<u32>()
            .map_err(|_| Error::parse(line_no, "invalid spin multiplicity"))?;

        let mut n_atoms = 0;
        loop {
            let (_, line) = cursor.expect(MOLECULE)?;
            if line.contains("$end") {
                break;
            }
            if !line.trim().is_empty() {
                n_atoms += 1;
            }
        }

        log::trace!("$molecule: {n_atoms} atoms, charge {charge}, multiplicity {multiplicity}");
        self.charge.get_or_insert(charge);
        self.multiplicity.get_or_insert(multiplicity);
        self.n_atoms = Some(n_atoms);
        Ok(())
    }

    fn read_rem(&mut self, cursor: &mut Cursor) -> Result<()> {
        loop {
            let (_, line) = cursor.expect(REM)?;
            if line.contains("$end") {
                return Ok(());
            }
            let mut fields = line.split_whitespace();
            let (Some(key), Some(value)) = (fields.next(), line.split_whitespace().last()) else {
                continue;
            };
            match key.to_ascii_lowercase().as_str() {
                "method" => self.method = Some(value.to_owned()),
                "exchange" if self.method.is_none() => self.method = Some(value.to_owned()),
                "basis" => self.basis = Some(value.to_owned()),
                _ => {}
            }
        }
    }

    fn read_orientation(&mut self, cursor: &mut Cursor) -> Result<()> {
        cursor.skip(2, ORIENTATION)?;

        let mut atomic_numbers = Vec::with_capacity(self.n_atoms.unwrap_or_default());
        let mut coordinates = Vec::with_capacity(self.n_atoms.unwrap_or_default());
        loop {
            let (line_no, line) = cursor.expect(ORIENTATION)?;
            if is_rule(line) || line.trim().is_empty() {
                break;
            }
            let fields = split_fields(line);
            atomic_numbers.push(periodic_table::atomic_number(field(&fields, 1, line_no)?)?);
            coordinates.push(Vector3::new(
                float(&fields, 2, line_no)?,
                float(&fields, 3, line_no)?,
                float(&fields, 4, line_no)?,
            ));
        }

        log::trace!("nuclear orientation with {} atoms", atomic_numbers.len());
        self.atomic_numbers.push(atomic_numbers);
        self.coordinates.push(coordinates);
        Ok(())
    }

    fn read_gradient(&mut self, cursor: &mut Cursor, n_atoms: usize) -> Result<()> {
        let mut forces: Vec<[f64; 3]> = Vec::with_capacity(n_atoms);
        while forces.len() < n_atoms {
            let (line_no, header) = cursor.expect(GRADIENT)?;
            let n_columns = header.split_whitespace().count();
            if n_columns == 0 {
                return Err(Error::parse(line_no, "empty gradient block header"));
            }

            let mut block = vec![[0.0; 3]; n_columns];
            for axis in 0..3 {
                let (line_no, line) = cursor.expect(GRADIENT)?;
                let fields = split_fields(line);
                if fields.len() != n_columns + 1 {
                    return Err(Error::parse(
                        line_no,
                        format!("expected {n_columns} gradient values"),
                    ));
                }
                for (column, force) in block.iter_mut().enumerate() {
                    force[axis] = float(&fields, column + 1, line_no)? / -BOHR_TO_ANGSTROM;
                }
            }
            forces.extend(block);
        }

        forces.truncate(n_atoms);
        self.forces.push(forces);
        Ok(())
    }

    /// Atom count of the current frame, falling back to the `$molecule` block.
    fn frame_atoms(&self, line: usize) -> Result<usize> {
        self.atomic_numbers
            .last()
            .map(Vec::len)
            .or(self.n_atoms)
            .ok_or_else(|| Error::parse(line, "property block before any geometry"))
    }

    pub fn counts(&self) -> FrameCounts {
        FrameCounts {
            coordinates: self.coordinates.len(),
            energies: self.energies.len(),
            forces: self.forces.len(),
            dipoles: self.dipoles.len(),
            quadrupoles: self.quadrupoles.len(),
            charges: self.charges.len(),
        }
    }

    /// `method.basis`, used as the prefix of every label name.
    pub fn level_of_theory(&self, options: &QchemOptions) -> String {
        format!(
            "{}.{}",
            self.method.as_deref().unwrap_or(&options.default_method),
            self.basis.as_deref().unwrap_or(&options.default_basis)
        )
    }

    /// Index of the first frame whose composition differs from the first one.
    fn inconsistent_frame(&self) -> Option<usize> {
        let first = self.atomic_numbers.first()?;
        self.atomic_numbers
            .iter()
            .position(|atomic_numbers| atomic_numbers != first)
    }

    fn frame_geometry(
        &self,
        mset: &MoleculeSet,
        frame: usize,
        prefix: &str,
        with_forces: bool,
    ) -> Result<Geometry> {
        let molecule_labels = Labels::from([
            (
                format!("{prefix}.potential"),
                LabelValue::Scalar(self.energies[frame]),
            ),
            (
                format!("{prefix}.dipole"),
                LabelValue::from(self.dipoles[frame]),
            ),
            (
                format!("{prefix}.quadrupole"),
                LabelValue::from(self.quadrupoles[frame].to_vec()),
            ),
        ]);

        let mut atom_labels = AtomLabels::new();
        if with_forces {
            atom_labels.insert(
                format!("{prefix}.forces"),
                self.forces[frame].iter().copied().map(LabelValue::from).collect(),
            );
        }
        atom_labels.insert(
            format!("{prefix}.charges"),
            self.charges[frame].iter().copied().map(LabelValue::from).collect(),
        );

        mset.build_geom(&self.coordinates[frame], molecule_labels, atom_labels)
    }

    /// Turn the extracted frames into a molecule set.
    pub fn build(&self, options: &QchemOptions) -> ParseOutcome {
        match self.try_build(options) {
            Ok(outcome) => outcome,
            Err(err) => ParseOutcome::Failed(err),
        }
    }

    fn try_build(&self, options: &QchemOptions) -> Result<ParseOutcome> {
        let Some(first) = self.atomic_numbers.first() else {
            return Err(match self.truncated {
                Some(marker) => Error::Truncated { marker },
                None => Error::parse(self.lines, "no nuclear orientation found"),
            });
        };
        if let Some(frame) = self.inconsistent_frame() {
            return Err(Error::InconsistentFrames { frame });
        }

        let prefix = self.level_of_theory(options);
        let mut mset = MoleculeSet::from_atomic_numbers(first);
        if let Some(charge) = self.charge {
            mset.set_identifier("charge", charge);
        }
        if let Some(multiplicity) = self.multiplicity {
            mset.set_identifier("multiplicity", multiplicity);
        }

        let mut warnings = Vec::new();
        if let Some(marker) = self.truncated {
            warnings.push(format!("log ended inside the '{marker}' block"));
        }

        let (trajectory, geometries) = match options.mode {
            TrajectoryMode::Converged => {
                let mut geometries = Vec::with_capacity(self.converged.len());
                for (line, counts) in &self.converged {
                    match counts.complete() {
                        Some(n_frames) => {
                            geometries.push(self.frame_geometry(&mset, n_frames - 1, &prefix, true)?)
                        }
                        None => warnings.push(format!(
                            "skipped optimization converged at line {line}: property counts {:?}",
                            counts.all()
                        )),
                    }
                }
                (format!("{prefix}.opt"), geometries)
            }
            TrajectoryMode::AllFrames => {
                let counts = self.counts();
                let with_forces = counts.forces > 0;
                let required = counts
                    .all()
                    .into_iter()
                    .enumerate()
                    .filter(|&(property, _)| with_forces || property != 2)
                    .map(|(_, count)| count)
                    .collect::<Vec<_>>();
                let n_frames = required.iter().copied().min().unwrap_or_default();

                if required.iter().any(|&count| count != n_frames) {
                    warnings.push(format!(
                        "kept {n_frames} complete frames, property counts {:?}",
                        counts.all()
                    ));
                }
                let geometries = (0..n_frames)
                    .map(|frame| self.frame_geometry(&mset, frame, &prefix, with_forces))
                    .collect::<Result<Vec<_>>>()?;
                (format!("{prefix}.optimize"), geometries)
            }
        };

        if geometries.is_empty() {
            return Err(match self.truncated {
                Some(marker) => Error::Truncated { marker },
                None => Error::parse(
                    self.lines,
                    match options.mode {
                        TrajectoryMode::Converged => "no converged optimization with complete properties",
                        TrajectoryMode::AllFrames => "no frame with complete properties",
                    },
                ),
            });
        }

        mset.insert_trajectory(trajectory, geometries)?;
        Ok(if warnings.is_empty() {
            ParseOutcome::Complete(mset)
        } else {
            for warning in &warnings {
                log::warn!("{warning}");
            }
            ParseOutcome::Partial { mset, warnings }
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{molecule::MinEnergy, testing::SyntheticLog};

    use super::*;

    const PREFIX: &str = "wB97X-D.6-311g**";

    fn parse_text(text: &str, mode: TrajectoryMode) -> ParseOutcome {
        let options = QchemOptions {
            mode,
            ..QchemOptions::default()
        };
        parse(text.as_bytes(), &options)
    }

    #[test]
    fn glued_numbers_are_split() {
        assert_eq!(
            split_fields("  1  0.0012345-0.0023456 -3.0 4.5E-05"),
            ["1", "0.0012345", "-0.0023456", "-3.0", "4.5E-05"]
        );
    }

    #[test]
    fn non_finite_fields_fail() {
        assert_eq!(float(&["1", "-76.4"], 1, 7).unwrap(), -76.4);
        for raw in ["NaN", "inf", "-infinity"] {
            assert!(matches!(
                float(&["1", raw], 1, 7),
                Err(Error::Parse { line: 7, .. })
            ));
        }

        let mut synthetic = SyntheticLog::water_optimization(2);
        synthetic.frames[1].energy = f64::NAN;
        assert!(matches!(
            parse_text(&synthetic.render(), TrajectoryMode::AllFrames),
            ParseOutcome::Failed(Error::Parse { .. })
        ));
    }

    #[test]
    fn converged_optimization() {
        let synthetic = SyntheticLog::water_optimization(3);
        let ParseOutcome::Complete(mset) = parse_text(&synthetic.render(), TrajectoryMode::Converged)
        else {
            panic!("expected a complete parse");
        };

        assert_eq!(mset.atomic_numbers(), [8, 1, 1]);
        assert_eq!(mset.identifier("charge"), Some(&0.into()));
        assert_eq!(mset.identifier("multiplicity"), Some(&1.into()));

        let trajectory = mset.trajectory(&format!("{PREFIX}.opt")).unwrap();
        assert_eq!(trajectory.len(), 1);

        let frame = &synthetic.frames[2];
        let geometry = &trajectory[0];
        for (atom, expected) in geometry.atoms().iter().zip(&frame.positions) {
            let position = atom.position().unwrap();
            assert_relative_eq!(position.x, expected[0], epsilon = 1e-9);
            assert_relative_eq!(position.y, expected[1], epsilon = 1e-9);
            assert_relative_eq!(position.z, expected[2], epsilon = 1e-9);
        }

        let energy = geometry.label(&format!("{PREFIX}.potential")).unwrap();
        assert_relative_eq!(energy.as_scalar().unwrap(), frame.energy, epsilon = 1e-9);

        let dipole = geometry.label(&format!("{PREFIX}.dipole")).unwrap();
        assert_relative_eq!(dipole.as_slice().unwrap()[2], frame.dipole[2], epsilon = 1e-4);

        let quadrupole = geometry.label(&format!("{PREFIX}.quadrupole")).unwrap();
        assert_eq!(quadrupole.as_slice().unwrap().len(), 6);
        assert_relative_eq!(quadrupole.as_slice().unwrap()[5], -6.051, epsilon = 1e-4);

        let oxygen = &geometry.atoms()[0];
        let force = oxygen.labels()[&format!("{PREFIX}.forces")].as_slice().unwrap();
        assert_relative_eq!(force[2], frame.gradient[0][2] / -BOHR_TO_ANGSTROM, epsilon = 1e-6);
        let charge = oxygen.labels()[&format!("{PREFIX}.charges")].as_scalar().unwrap();
        assert_relative_eq!(charge, -0.815633, epsilon = 1e-9);

        match mset.min_energy_geometry() {
            MinEnergy::Found { label, .. } => assert_eq!(label, format!("{PREFIX}.potential")),
            MinEnergy::NoEnergyLabel => panic!("the potential label should be recognized"),
        }
    }

    #[test]
    fn every_frame() {
        let synthetic = SyntheticLog::water_optimization(4);
        let ParseOutcome::Complete(mset) = parse_text(&synthetic.render(), TrajectoryMode::AllFrames)
        else {
            panic!("expected a complete parse");
        };

        let trajectory = mset.trajectory(&format!("{PREFIX}.optimize")).unwrap();
        assert_eq!(trajectory.len(), 4);
        let energies = trajectory
            .iter()
            .map(|g| g.label(&format!("{PREFIX}.potential")).unwrap().as_scalar().unwrap())
            .collect::<Vec<_>>();
        for (energy, frame) in energies.iter().zip(&synthetic.frames) {
            assert_relative_eq!(*energy, frame.energy, epsilon = 1e-9);
        }
        assert_eq!(mset.min_energy_geometry().geometry(), trajectory.last());
    }

    #[test]
    fn gradient_blocks_of_six_atoms() {
        let mut synthetic = SyntheticLog::water_optimization(1);
        synthetic.symbols = vec!["C", "C", "H", "H", "H", "H", "H", "H"];
        let frame = &mut synthetic.frames[0];
        frame.positions = (0..8).map(|i| [i as f64, 0.5 * i as f64, -0.1]).collect();
        frame.gradient = (0..8).map(|i| [0.001 * i as f64, -0.002, 0.003]).collect();
        frame.charges = vec![-0.3, -0.3, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1];

        let outcome = parse_text(&synthetic.render(), TrajectoryMode::Converged);
        let mset = outcome.molecule_set().expect("ethane should parse");
        assert_eq!(mset.formula_string().unwrap(), "C2H6");

        let geometry = mset.get(0).unwrap();
        let last = geometry.atoms()[7].labels()[&format!("{PREFIX}.forces")]
            .as_slice()
            .unwrap()
            .to_vec();
        assert_relative_eq!(last[0], 0.007 / -BOHR_TO_ANGSTROM, epsilon = 1e-6);
        assert_relative_eq!(last[1], 0.002 / BOHR_TO_ANGSTROM, epsilon = 1e-6);
    }

    #[test]
    fn truncated_log() {
        let text = SyntheticLog::water_optimization(3).render();
        let cut = text.rfind(GRADIENT).unwrap() + GRADIENT.len() + 1;
        let truncated = &text[..cut];

        match parse_text(truncated, TrajectoryMode::Converged) {
            ParseOutcome::Failed(Error::Truncated { marker }) => assert_eq!(marker, GRADIENT),
            other => panic!("expected a truncation failure, got {other:?}"),
        }

        match parse_text(truncated, TrajectoryMode::AllFrames) {
            ParseOutcome::Partial { mset, warnings } => {
                assert_eq!(mset.len(), 2);
                assert_eq!(warnings.len(), 2);
            }
            other => panic!("expected a partial parse, got {other:?}"),
        }
    }

    #[test]
    fn inconsistent_frames_fail() {
        let mut text = SyntheticLog::water_optimization(2).render();
        let row = text.rfind("    3     H").unwrap();
        text.replace_range(row + 10..row + 11, "F");

        match parse_text(&text, TrajectoryMode::Converged) {
            ParseOutcome::Failed(Error::InconsistentFrames { frame }) => assert_eq!(frame, 1),
            other => panic!("expected inconsistent frames, got {other:?}"),
        }
    }

    #[test]
    fn unknown_symbols_and_missing_geometry() {
        let mut text = SyntheticLog::water_optimization(1).render();
        let row = text.rfind("    2     H").unwrap();
        text.replace_range(row + 10..row + 11, "Q");
        assert!(matches!(
            parse_text(&text, TrajectoryMode::Converged),
            ParseOutcome::Failed(Error::UnknownSymbol(_))
        ));

        assert!(matches!(
            parse_text("no useful content\n", TrajectoryMode::AllFrames),
            ParseOutcome::Failed(Error::Parse { .. })
        ));
    }

    #[test]
    fn rem_defaults_and_source_identifier() {
        let mut synthetic = SyntheticLog::water_optimization(2);
        synthetic.method = String::new();
        let text = synthetic.render().replace("   method     \n", "");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("12345.out");
        std::fs::write(&path, text).unwrap();

        let outcome = parse_file(&path, &QchemOptions::default());
        let mset = outcome.molecule_set().unwrap();
        assert_eq!(mset.identifier("source"), Some(&"12345".into()));
        assert!(mset.trajectory("unknown.6-311g**.opt").is_some());
    }
}
