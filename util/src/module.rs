//! Module interfaces
//!
//! Each cyclic module in `srr_exec` (for example the perception manager)
//! shall implement the [`State`] trait, which fixes the shape of the
//! initialise-once / process-every-tick lifecycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
pub trait State {
    /// Data required during initialisation, normally the module's parameter
    /// struct or the path to its parameter file.
    type InitData;
    /// An error which can occur during initialisation.
    type InitError;

    /// Data required for one tick of cyclic processing.
    type InputData;
    /// Data produced by one tick of cyclic processing.
    type OutputData;
    /// A report on the status of the cyclic processing.
    type StatusReport;
    /// An error which can occur during cyclic processing.
    type ProcError;

    /// Initialise the module.
    ///
    /// # Outputs
    /// - On success `Ok(())`.
    /// - On error an `InitError` instance.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Main module processing function, called exactly once per tick.
    ///
    /// # Outputs
    /// - On success a tuple of the output data and status report.
    /// - On error a `ProcError` instance.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
