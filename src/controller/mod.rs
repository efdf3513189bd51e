// CONTROLLER: Input, simulation driving, and the per-frame loop
pub mod input;
pub mod movement;
pub mod camera_controller;
pub mod contact;
pub mod transform_sync;
pub mod physics;
pub mod assets;
pub mod frame_loop;

pub use input::{InputEvent, InputProcessor, InputState, KeyBindings};
pub use movement::CharacterController;
pub use camera_controller::OrbitController;
pub use contact::{ContactPolicy, FrozenGravity, RestingContact};
pub use transform_sync::sync_transforms;
pub use physics::{PhysicsStepDriver, Simulation, StepReport};
pub use assets::{AssetLoader, AssetSlot, LoadTicket};
pub use frame_loop::{FrameClock, FrameLoopContext, FrameRenderer, FrameStats};
