/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use gdbind::prelude::*;

/// Awards one point per second survived, plus bonus points.
///
/// Scripts award bonus points with `add(points)` and read the score with `total()`.
pub struct ScoreKeeper {
    base: Base<Node>,
    score: i64,
    elapsed: f64,
    running: bool,
}

impl ScoreKeeper {
    pub fn add(&mut self, points: i64) {
        self.score += points;
    }

    pub fn total(&self) -> i64 {
        self.score
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl GodotClass for ScoreKeeper {
    const CLASS_NAME: &'static str = "ScoreKeeper";
    type EngineBase = Node;
}

impl UserClass for ScoreKeeper {
    fn init(base: Base<Node>) -> Self {
        Self {
            base,
            score: 0,
            elapsed: 0.0,
            running: false,
        }
    }

    fn virtuals() -> VirtualTable<Self> {
        Node::virtual_table(&[NodeVirtual::Ready, NodeVirtual::Process])
    }

    fn methods() -> Vec<MethodSlot<Self>> {
        vec![
            MethodSlot::<Self>::new("add", 1, |this, args, _ret| {
                // SAFETY: registered with one int argument.
                this.add(unsafe { args.get::<i64>(0) });
            }),
            MethodSlot::<Self>::returning("total", 0, |this, _args, ret| ret.set(this.total())).with_const(),
        ]
    }
}

impl INode for ScoreKeeper {
    fn ready(&mut self) {
        log::debug!("ScoreKeeper {} ready", self.base.instance_id());
        self.running = true;
    }

    fn process(&mut self, delta: f64) {
        if !self.running {
            return;
        }

        self.elapsed += delta;
        while self.elapsed >= 1.0 {
            self.elapsed -= 1.0;
            self.score += 1;
        }
    }
}

// SAFETY: the engine object is a Node.
unsafe impl Inherits<Node> for ScoreKeeper {}

register_class!(ScoreKeeper);
