//! Synthetic Q-Chem output used by tests and benchmarks.
use std::fmt::Write;

/// One optimization step of a synthetic log.
#[derive(Clone, Debug)]
pub struct SyntheticFrame {
    pub positions: Vec<[f64; 3]>,
    pub energy: f64,
    /// gradient in Hartree/Bohr, as Q-Chem prints it
    pub gradient: Vec<[f64; 3]>,
    pub dipole: [f64; 3],
    pub quadrupole: [f64; 6],
    pub charges: Vec<f64>,
}

#[derive(Clone, Debug)]
pub struct SyntheticLog {
    pub method: String,
    pub basis: String,
    pub charge: i32,
    pub multiplicity: u32,
    pub symbols: Vec<&'static str>,
    pub frames: Vec<SyntheticFrame>,
    /// indices of the frames after which `OPTIMIZATION CONVERGED` is printed
    pub converged_after: Vec<usize>,
}

impl SyntheticLog {
    /// A water geometry optimization with `n_steps` steps, converging after
    /// the last one.
    pub fn water_optimization(n_steps: usize) -> Self {
        let frames = (0..n_steps)
            .map(|step| {
                let shift = 0.01 * step as f64;
                SyntheticFrame {
                    positions: vec![
                        [0.0, 0.0, 0.1173 + shift],
                        [0.0, 0.7572 - shift, -0.4692],
                        [0.0, -0.7572 + shift, -0.4692],
                    ],
                    energy: -76.4 - 0.001 * step as f64,
                    gradient: vec![
                        [0.0, 0.0, -0.0124 + shift],
                        [0.0, 0.0152, 0.0062],
                        [0.0, -0.0152, 0.0062],
                    ],
                    dipole: [0.0, 0.0, 2.1019 + shift],
                    quadrupole: [-7.153, 0.0, -4.0916, 0.0, 0.0, -6.051],
                    charges: vec![-0.815633, 0.407816, 0.407817],
                }
            })
            .collect();

        Self {
            method: "wB97X-D".to_owned(),
            basis: "6-311g**".to_owned(),
            charge: 0,
            multiplicity: 1,
            symbols: vec!["O", "H", "H"],
            frames,
            converged_after: vec![n_steps.saturating_sub(1)],
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out).ok();
        out
    }

    fn write_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "                  Welcome to Q-Chem")?;
        writeln!(out, "--------------------------------------------------------------")?;
        writeln!(out, "User input:")?;
        writeln!(out, "--------------------------------------------------------------")?;
        writeln!(out, "$molecule")?;
        writeln!(out, "{} {}", self.charge, self.multiplicity)?;
        for (symbol, position) in self
            .symbols
            .iter()
            .zip(self.frames.first().map(|f| f.positions.as_slice()).unwrap_or(&[]))
        {
            writeln!(
                out,
                "{symbol}   {:.6}   {:.6}   {:.6}",
                position[0], position[1], position[2]
            )?;
        }
        writeln!(out, "$end")?;
        writeln!(out)?;
        writeln!(out, "$rem")?;
        writeln!(out, "   JOBTYPE    opt")?;
        writeln!(out, "   method     {}", self.method)?;
        writeln!(out, "   basis      {}", self.basis)?;
        writeln!(out, "$end")?;
        writeln!(out, "--------------------------------------------------------------")?;

        for (step, frame) in self.frames.iter().enumerate() {
            self.write_frame(out, frame)?;
            if self.converged_after.contains(&step) {
                writeln!(out, "       **  OPTIMIZATION CONVERGED  **")?;
            }
        }

        writeln!(out, "        *  Thank you very much for using Q-Chem.  Have a nice day.  *")
    }

    fn write_frame(&self, out: &mut String, frame: &SyntheticFrame) -> std::fmt::Result {
        writeln!(out, "             Standard Nuclear Orientation (Angstroms)")?;
        writeln!(out, "    I     Atom           X                Y                Z")?;
        writeln!(out, " ----------------------------------------------------------------")?;
        for (index, (symbol, p)) in self.symbols.iter().zip(&frame.positions).enumerate() {
            writeln!(
                out,
                "    {:<4}  {:<4}{:>17.10}{:>17.10}{:>17.10}",
                index + 1,
                symbol,
                p[0],
                p[1],
                p[2]
            )?;
        }
        writeln!(out, " ----------------------------------------------------------------")?;

        writeln!(out, " ---------------------------------------")?;
        writeln!(out, "  Cycle       Energy         DIIS Error")?;
        writeln!(out, " ---------------------------------------")?;
        writeln!(out, "    1     {:.10}      4.01e-02  ", frame.energy + 0.5)?;
        writeln!(
            out,
            "    2     {:.10}      1.02e-09  00000 Convergence criterion met",
            frame.energy
        )?;
        writeln!(out, " ---------------------------------------")?;

        writeln!(out, "          Ground-State Mulliken Net Atomic Charges")?;
        writeln!(out)?;
        writeln!(out, "     Atom                 Charge (a.u.)")?;
        writeln!(out, "  ----------------------------------------")?;
        for (index, (symbol, charge)) in self.symbols.iter().zip(&frame.charges).enumerate() {
            writeln!(out, "      {} {:<2}{:>25.6}", index + 1, symbol, charge)?;
        }
        writeln!(out, "  ----------------------------------------")?;

        let [dx, dy, dz] = frame.dipole;
        writeln!(out, "    Dipole Moment (Debye)")?;
        writeln!(out, "         X {dx:>12.4}      Y {dy:>12.4}      Z {dz:>12.4}")?;
        writeln!(out, "       Tot {:>12.4}", (dx * dx + dy * dy + dz * dz).sqrt())?;
        let [xx, xy, yy, xz, yz, zz] = frame.quadrupole;
        writeln!(out, "    Quadrupole Moments (Debye-Ang)")?;
        writeln!(out, "        XX {xx:>12.4}     XY {xy:>12.4}     YY {yy:>12.4}")?;
        writeln!(out, "        XZ {xz:>12.4}     YZ {yz:>12.4}     ZZ {zz:>12.4}")?;

        writeln!(out, " ----------------------------------------------------------------")?;
        writeln!(out, " Gradient of SCF Energy")?;
        for (block, atoms) in frame.gradient.chunks(6).enumerate() {
            let header = (0..atoms.len())
                .map(|i| format!("{:>12}", block * 6 + i + 1))
                .collect::<String>();
            writeln!(out, "{header}")?;
            for axis in 0..3 {
                let values = atoms
                    .iter()
                    .map(|g| format!("{:>12.7}", g[axis]))
                    .collect::<String>();
                writeln!(out, "    {}{values}", axis + 1)?;
            }
        }
        writeln!(out, " Max gradient component =       1.520E-02")
    }
}
