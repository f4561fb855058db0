/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use gdbind::prelude::*;

/// Score panel in the top-left corner.
pub struct Hud {
    base: Base<Control>,
}

impl Hud {
    pub const DEFAULT_SIZE: Vector2 = Vector2::new(240.0, 64.0);
}

impl GodotClass for Hud {
    const CLASS_NAME: &'static str = "Hud";
    type EngineBase = Control;
}

impl UserClass for Hud {
    fn init(base: Base<Control>) -> Self {
        Self { base }
    }

    fn virtuals() -> VirtualTable<Self> {
        Control::virtual_table(&[
            ControlVirtual::Node(NodeVirtual::Ready),
            ControlVirtual::HasPoint,
            ControlVirtual::GetMinimumSize,
        ])
    }
}

impl INode for Hud {
    fn ready(&mut self) {
        let mut control = self.base.to_gd();
        control.set_position(Vector2::ZERO);
        control.set_size(Self::DEFAULT_SIZE);
    }
}

impl IControl for Hud {
    fn has_point(&self, point: Vector2) -> bool {
        (0.0..Self::DEFAULT_SIZE.x).contains(&point.x) && (0.0..Self::DEFAULT_SIZE.y).contains(&point.y)
    }

    fn get_minimum_size(&self) -> Vector2 {
        Self::DEFAULT_SIZE
    }
}

// SAFETY: the engine object is a Control, which derives from Node.
unsafe impl Inherits<Node> for Hud {}

register_class!(Hud);
