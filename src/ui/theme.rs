use ratatui::style::Color;

// Cool slate palette with a single blue accent. New colors should earn a
// named role here rather than being inlined at the call site.
pub const BG: Color = Color::Rgb(13, 15, 20);
pub const SURFACE: Color = Color::Rgb(20, 24, 31);
pub const BAR_BG: Color = Color::Rgb(16, 20, 27);

pub const FG: Color = Color::Rgb(226, 229, 234);
pub const MUTED: Color = Color::Rgb(148, 156, 168);
pub const DIM: Color = Color::Rgb(100, 108, 120);
pub const BORDER: Color = Color::Rgb(52, 60, 74);

pub const ACCENT: Color = Color::Rgb(96, 165, 250);
pub const ACCENT_BG: Color = Color::Rgb(19, 32, 51);

// Semantic colors for diff counters.
pub const ADDED: Color = Color::Rgb(134, 239, 172);
pub const REMOVED: Color = Color::Rgb(248, 113, 113);
