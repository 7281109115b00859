/// Layout options for console output
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub depth: usize,
    pub width: usize,
}

impl DisplayOptions {
    pub fn new() -> Self {
        Self {
            depth: 0,
            width: 80,
        }
    }

    pub fn with_depth(&self, depth: usize) -> Self {
        Self {
            depth,
            width: self.width,
        }
    }

    pub fn with_width(&self, width: usize) -> Self {
        Self {
            depth: self.depth,
            width,
        }
    }

    pub fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Core rendering trait for everything the debug tags print
pub trait Render {
    fn render(&self, options: &DisplayOptions) -> String;
}
