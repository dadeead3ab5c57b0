//! Stable sort of the command buffer by `(render_layer, global_order,
//! tree_order)` (§4.5).

use crate::backend::Backend;
use crate::command::RenderCommand;

#[inline]
fn sort_key<B: Backend>(cmd: &RenderCommand<B>) -> (i32, i32, u64) {
    (cmd.render_layer, cmd.global_order, cmd.tree_order)
}

/// Sorts `commands` in place, using `scratch` as merge-sort working space
/// (grown to a high-water mark and reused across frames, per §4.5/§9).
///
/// An O(n) pass first checks whether the buffer is already non-decreasing
/// under the sort key — the common case for a static scene — and returns
/// immediately if so. Otherwise a bottom-up (iterative) merge sort runs,
/// which is stable and touches `scratch` rather than allocating.
pub fn stable_sort_commands<B: Backend>(commands: &mut Vec<RenderCommand<B>>, scratch: &mut Vec<RenderCommand<B>>) {
    if is_already_sorted(commands) {
        return;
    }
    bottom_up_merge_sort(commands, scratch);
}

fn is_already_sorted<B: Backend>(commands: &[RenderCommand<B>]) -> bool {
    commands.windows(2).all(|w| sort_key(&w[0]) <= sort_key(&w[1]))
}

fn bottom_up_merge_sort<B: Backend>(commands: &mut Vec<RenderCommand<B>>, scratch: &mut Vec<RenderCommand<B>>) {
    let len = commands.len();
    if len < 2 {
        return;
    }
    if scratch.len() < len {
        scratch.resize(len, commands[0]);
    }

    let mut width = 1;
    let mut source_is_commands = true;
    while width < len {
        {
            let (src, dst): (&[RenderCommand<B>], &mut [RenderCommand<B>]) =
                if source_is_commands { (&commands[..], &mut scratch[..len]) } else { (&scratch[..len], &mut commands[..]) };
            let mut start = 0;
            while start < len {
                let mid = (start + width).min(len);
                let end = (start + 2 * width).min(len);
                merge(src, start, mid, end, dst);
                start += 2 * width;
            }
        }
        source_is_commands = !source_is_commands;
        width *= 2;
    }

    if !source_is_commands {
        commands[..len].copy_from_slice(&scratch[..len]);
    }
}

fn merge<B: Backend>(src: &[RenderCommand<B>], start: usize, mid: usize, end: usize, dst: &mut [RenderCommand<B>]) {
    let mut i = start;
    let mut j = mid;
    let mut k = start;
    while i < mid && j < end {
        if sort_key(&src[i]) <= sort_key(&src[j]) {
            dst[k] = src[i];
            i += 1;
        } else {
            dst[k] = src[j];
            j += 1;
        }
        k += 1;
    }
    while i < mid {
        dst[k] = src[i];
        i += 1;
        k += 1;
    }
    while j < end {
        dst[k] = src[j];
        j += 1;
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::FakeBackend;
    use crate::blend::BlendMode;
    use crate::command::{CommandKind, CommandPayload, CommandTexture};
    use crate::geom::{Affine2, Color};
    use crate::texture::TextureRegion;

    fn cmd(layer: i32, order: i32, tree_order: u64) -> RenderCommand<FakeBackend> {
        RenderCommand {
            kind: CommandKind::Sprite,
            transform: Affine2::IDENTITY,
            texture: CommandTexture::Region(TextureRegion::magenta_placeholder()),
            color: Color::WHITE,
            blend: BlendMode::Normal,
            shader_id: 0,
            target_id: 0,
            render_layer: layer,
            global_order: order,
            tree_order,
            payload: CommandPayload::None,
            transient_direct_image: false,
            emitting_node_id: None,
        }
    }

    #[test]
    fn sorts_by_layer_then_order_then_tree_order() {
        let mut commands = vec![cmd(1, 0, 0), cmd(0, 0, 1), cmd(0, 0, 2)];
        let mut scratch = Vec::new();
        stable_sort_commands(&mut commands, &mut scratch);
        let keys: Vec<_> = commands.iter().map(sort_key).collect();
        assert_eq!(keys, vec![(0, 0, 1), (0, 0, 2), (1, 0, 0)]);
    }

    #[test]
    fn ties_keep_emission_order() {
        let mut commands = vec![cmd(2, 0, 1), cmd(0, 0, 1), cmd(0, 0, 1)];
        let mut scratch = Vec::new();
        stable_sort_commands(&mut commands, &mut scratch);
        // Both (0,0,1) entries are genuinely indistinguishable by key; a
        // stable sort must still place the unique (2,0,1) entry last.
        assert_eq!(sort_key(&commands[2]), (2, 0, 1));
    }

    #[test]
    fn already_sorted_fast_path_is_a_noop_copy() {
        let mut commands = vec![cmd(0, 0, 0), cmd(0, 0, 1), cmd(1, 0, 2)];
        let mut scratch = Vec::new();
        stable_sort_commands(&mut commands, &mut scratch);
        let keys: Vec<_> = commands.iter().map(sort_key).collect();
        assert_eq!(keys, vec![(0, 0, 0), (0, 0, 1), (1, 0, 2)]);
    }
}
