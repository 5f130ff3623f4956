use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedrawState {
    #[default]
    Idle,
    FullRedrawPending,
    ScrollPending,
    ChangeRedraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullRedraw {
    All,
    UnlessChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeWork {
    pub clear_frame: bool,
    pub full_redraw: Option<FullRedraw>,
    pub scrolls_drained: usize,
    pub change_redraw: bool,
}

#[derive(Debug, Default)]
pub struct RedrawScheduler {
    state: RedrawState,
    clear_pending: bool,
    scrolls: VecDeque<(i32, i32)>,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self {
            state: RedrawState::FullRedrawPending,
            clear_pending: true,
            scrolls: VecDeque::new(),
        }
    }

    pub fn state(&self) -> RedrawState {
        self.state
    }

    pub fn pending_scrolls(&self) -> usize {
        self.scrolls.len()
    }

    pub fn on_new_map(&mut self) {
        self.state = RedrawState::FullRedrawPending;
        self.clear_pending = true;
        self.scrolls.clear();
    }

    pub fn on_scroll(&mut self, dx: i32, dy: i32) {
        self.scrolls.push_back((dx, dy));
        if self.state != RedrawState::FullRedrawPending {
            self.state = RedrawState::ScrollPending;
        }
    }

    pub fn on_geometry_changed(&mut self) {
        self.scrolls.clear();
        self.clear_pending = false;
        self.state = RedrawState::Idle;
    }

    pub fn begin_change(&mut self) -> ChangeWork {
        let clear_frame = std::mem::take(&mut self.clear_pending);
        let drained: Vec<(i32, i32)> = self.scrolls.drain(..).collect();

        if self.state == RedrawState::FullRedrawPending {
            return ChangeWork {
                clear_frame,
                full_redraw: Some(FullRedraw::All),
                scrolls_drained: drained.len(),
                change_redraw: false,
            };
        }

        // Deltas are applied to the map already; every nonzero one asks for
        // the same recompute, so one redraw covers the whole queue.
        let scrolled = drained.iter().any(|&delta| delta != (0, 0));
        self.state = RedrawState::ChangeRedraw;
        ChangeWork {
            clear_frame,
            full_redraw: scrolled.then_some(FullRedraw::UnlessChanged),
            scrolls_drained: drained.len(),
            change_redraw: true,
        }
    }

    pub fn finish(&mut self) {
        self.state = RedrawState::Idle;
    }
}
