use crate::error::{Error, Result};

/// Element symbols indexed by atomic number. Index 0 is the dummy atom `X`.
pub const SYMBOLS: [&str; 119] = [
    "X", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn",
    "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Returns the element symbol of an atomic number, `X` for the dummy atom 0.
pub fn symbol(atomic_num: u32) -> Result<&'static str> {
    SYMBOLS
        .get(atomic_num as usize)
        .copied()
        .ok_or(Error::UnknownAtomicNumber(atomic_num))
}

/// Returns the atomic number of an element symbol. Log files sometimes print
/// symbols in upper case (`CL`), so the lookup ignores case.
pub fn atomic_number(symbol: &str) -> Result<u32> {
    SYMBOLS
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(symbol))
        .map(|index| index as u32)
        .ok_or_else(|| Error::UnknownSymbol(symbol.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip() {
        for n in 0..SYMBOLS.len() as u32 {
            assert_eq!(atomic_number(symbol(n).unwrap()).unwrap(), n);
        }
    }

    #[test]
    fn dummy_atom() {
        assert_eq!(symbol(0).unwrap(), "X");
        assert_eq!(atomic_number("X").unwrap(), 0);
        assert_eq!(atomic_number("Xe").unwrap(), 54);
    }

    #[test]
    fn lookups_fail_outside_the_table() {
        assert!(matches!(symbol(119), Err(Error::UnknownAtomicNumber(119))));
        assert!(matches!(atomic_number("Xx"), Err(Error::UnknownSymbol(_))));
        assert!(matches!(atomic_number(""), Err(Error::UnknownSymbol(_))));
    }

    #[test]
    fn symbol_lookup_ignores_case() {
        assert_eq!(atomic_number("CL").unwrap(), 17);
        assert_eq!(atomic_number("o").unwrap(), 8);
    }
}
