//! Keyboard input decoded into scene commands
//!
//! The windowing layer translates platform key codes into [`Key`]; the scene
//! only ever sees [`Command`]s.

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Digit(u8),
    A,
    C,
    D,
    G,
    J,
    M,
    P,
    R,
    S,
    T,
    W,
    Left,
    Right,
    Up,
    Down,
    Space,
    Equal,
    Minus,
    NumpadAdd,
    NumpadSubtract,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Repeat,
    Release,
}

/// What the event loop should do after an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// A user intent the scene composer acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Lock the camera on the body at this index
    SelectBody(usize),
    FreeOrbit,
    FollowVehicle,
    ZoomIn,
    ZoomOut,
    RandomizePhases,
    ToggleGreyscale,
    ThrustForward,
    ThrustBackward,
    TurnLeft,
    TurnRight,
    CycleCurveDisplay,
    ToggleParallelTransport,
    OrbitLeft,
    OrbitRight,
    OrbitUp,
    OrbitDown,
    TogglePause,
    DoubleTimeStep,
    HalveTimeStep,
    ReloadShaders,
    Quit,
}

impl Command {
    /// Maps a key event to a command; releases never map to anything
    pub fn from_key(key: Key, action: KeyAction) -> Option<Command> {
        if action == KeyAction::Release {
            return None;
        }

        let command = match key {
            Key::Digit(0) => Command::FreeOrbit,
            Key::Digit(digit @ 1..=6) => Command::SelectBody(usize::from(digit) - 1),
            Key::Digit(7) => Command::FollowVehicle,
            Key::Digit(8) => Command::ZoomIn,
            Key::Digit(9) => Command::ZoomOut,
            Key::Digit(_) => return None,
            Key::R => Command::RandomizePhases,
            Key::G => Command::ToggleGreyscale,
            Key::W => Command::ThrustForward,
            Key::S => Command::ThrustBackward,
            Key::A => Command::TurnLeft,
            Key::D => Command::TurnRight,
            Key::C => Command::CycleCurveDisplay,
            Key::T => Command::ToggleParallelTransport,
            Key::Left => Command::OrbitLeft,
            Key::Right => Command::OrbitRight,
            Key::Up => Command::OrbitUp,
            Key::Down => Command::OrbitDown,
            Key::Space => Command::TogglePause,
            Key::P | Key::Equal | Key::NumpadAdd => Command::DoubleTimeStep,
            Key::M | Key::Minus | Key::NumpadSubtract => Command::HalveTimeStep,
            Key::J => Command::ReloadShaders,
            Key::Escape => Command::Quit,
        };
        Some(command)
    }
}
