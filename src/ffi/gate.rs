//! ### English
//! `TaskGate` adapter over embedder-provided C hooks.
//!
//! ### 中文
//! 基于宿主 C 钩子的 `TaskGate` 适配器。

use crate::engine::TaskGate;

use super::{UserData, XianVsyncClosure, XianVsyncTaskGate};

pub(super) struct ForeignTaskGate {
    pause: XianVsyncClosure,
    resume: XianVsyncClosure,
    user_data: UserData,
}

impl From<XianVsyncTaskGate> for ForeignTaskGate {
    fn from(value: XianVsyncTaskGate) -> Self {
        Self {
            pause: value.pause,
            resume: value.resume,
            user_data: UserData(value.user_data),
        }
    }
}

impl TaskGate for ForeignTaskGate {
    fn pause_cooperative_queue(&self) {
        if let Some(pause) = self.pause {
            unsafe { pause(self.user_data.get()) };
        }
    }

    fn resume_cooperative_queue(&self) {
        if let Some(resume) = self.resume {
            unsafe { resume(self.user_data.get()) };
        }
    }
}
