/// Whether the widget shows its launcher or the full conversation panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Collapsed,
    Expanded,
}

impl Visibility {
    /// Activate the launcher. Returns `true` if the state changed.
    pub fn open(&mut self) -> bool {
        self.transition(Visibility::Expanded)
    }

    /// Activate the close affordance. Returns `true` if the state changed.
    pub fn close(&mut self) -> bool {
        self.transition(Visibility::Collapsed)
    }

    pub fn is_expanded(self) -> bool {
        self == Visibility::Expanded
    }

    fn transition(&mut self, to: Visibility) -> bool {
        let changed = *self != to;
        *self = to;
        changed
    }
}
