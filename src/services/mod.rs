pub mod simulation;

pub use simulation::SimulationService;
