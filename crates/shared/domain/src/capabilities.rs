use bitflags::bitflags;

bitflags! {
    /// Optional protocol capabilities announced by `check`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const SEARCH = 1 << 0;

        const ALL = Self::SEARCH.bits();
    }
}

impl Capabilities {
    /// Wire names of the enabled capabilities, in declaration order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        self.iter().filter_map(|flag| match flag {
            Self::SEARCH => Some("search"),
            _ => None,
        })
    }
}
