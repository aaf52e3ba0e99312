use std::io::{self, Write};

use super::formula::Lit;

/// Emits a DRAT (Deletion Resolution Asymmetric Tautology) proof: one line
/// per learnt-clause addition, and one `d`-prefixed line per clause
/// deletion, in the plain-text format `drat-trim` accepts. Kept to a
/// straightforward `write!` per literal rather than pulling in a formatting
/// crate, since nothing else in this stack needs one.
pub struct DratWriter<W: Write> {
    writer: W,
}

impl<W: Write> DratWriter<W> {
    pub fn new(writer: W) -> DratWriter<W> {
        DratWriter { writer }
    }

    fn write_lits(&mut self, lits: &[Lit]) -> io::Result<()> {
        for &lit in lits {
            let ext = (lit.var().index() as i64 + 1) * if lit.sign() { -1 } else { 1 };
            write!(self.writer, "{} ", ext)?;
        }
        writeln!(self.writer, "0")
    }

    /// Records a learnt (or original, if proof logging starts mid-run)
    /// clause addition.
    pub fn add_clause(&mut self, lits: &[Lit]) -> io::Result<()> {
        self.write_lits(lits)
    }

    /// Records that a clause is no longer needed and may be forgotten by a
    /// verifier replaying the proof in order.
    pub fn delete_clause(&mut self, lits: &[Lit]) -> io::Result<()> {
        write!(self.writer, "d ")?;
        self.write_lits(lits)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Var;

    #[test]
    fn formats_signed_literals() {
        let mut buf = Vec::new();
        {
            let mut w = DratWriter::new(&mut buf);
            let a = Var::from_index(0).pos_lit();
            let b = Var::from_index(1).neg_lit();
            w.add_clause(&[a, b]).unwrap();
            w.delete_clause(&[a]).unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "1 -2 0\nd 1 0\n");
    }
}
