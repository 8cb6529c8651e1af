//! # Plot data
//!
//! Plot-ready series built from calculations and defect studies. Nothing here draws: each plot
//! holds the curves, markers and annotations a renderer needs, and writes its series as CSV.

mod alignment;
mod bands;
mod comparison;
mod dos;
mod export;
mod formation;

pub use alignment::AlignmentPlot;
pub use bands::{BandDiagram, BandDiagramParameters};
pub use comparison::{DosComparison, DosComparisonParameters};
pub use dos::{DosCurve, DosPlot, DosPlotParameters, Projection};
pub use formation::{
    FormationPlot, FormationPlotParameters, TransitionDiagram, TransitionDiagramParameters,
};
