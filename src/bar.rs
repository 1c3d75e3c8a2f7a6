use crate::types::{Cut, CuttingPlan};

/// A stock bar being filled front to back. Every cut after the first costs
/// one blade width of kerf.
#[derive(Debug, Clone)]
pub struct Bar {
    stock_length: u32,
    kerf: u32,
    used: u32,
    pub cuts: Vec<Cut>,
}

impl Bar {
    pub fn new(stock_length: u32, kerf: u32) -> Self {
        Self {
            stock_length,
            kerf,
            used: 0,
            cuts: Vec::new(),
        }
    }

    /// Length consumed after cutting one more piece, kerf included.
    pub fn next_length(&self, piece_length: u32) -> u64 {
        let kerf = if self.cuts.is_empty() { 0 } else { self.kerf };
        self.used as u64 + piece_length as u64 + kerf as u64
    }

    pub fn fits(&self, piece_length: u32) -> bool {
        self.next_length(piece_length) <= self.stock_length as u64
    }

    /// Appends a cut. Callers check `fits` first.
    pub fn place(&mut self, piece_length: u32, source_piece_index: usize) {
        debug_assert!(self.fits(piece_length));
        self.used = self.next_length(piece_length) as u32;
        self.cuts.push(Cut {
            length: piece_length,
            source_piece_index,
        });
    }

    pub fn residual(&self) -> u32 {
        self.stock_length - self.used
    }

    pub fn kerf_loss(&self) -> u32 {
        self.cuts.len().saturating_sub(1) as u32 * self.kerf
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn into_plan(self) -> CuttingPlan {
        CuttingPlan {
            stock_length: self.stock_length,
            kerf_loss: self.kerf_loss(),
            residual_waste: self.residual(),
            cuts: self.cuts,
        }
    }
}
