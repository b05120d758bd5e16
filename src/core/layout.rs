//! The layouts available for arranging clients on a monitor
//!
//! Layouts are pure: given a monitor and the visible tiled clients in
//! arrangement order they produce target geometries without issuing any X
//! requests. The produced rects are client geometries (borders are
//! subtracted from each cell, so the outer extent of each window fills the
//! cell exactly).
use crate::{
    pure::{geometry::Rect, Client, Monitor},
    Xid,
};

/// A layout algorithm: `(monitor, visible tiled clients, visible count)` to
/// an optional layout-symbol override plus target client geometries.
pub type ArrangeFn = fn(&Monitor, &[&Client], usize) -> (Option<String>, Vec<(Xid, Rect)>);

/// A named layout slot for the per-monitor layout table.
///
/// A layout without an arrange function is floating: clients keep their
/// user-chosen geometries.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    /// Short display string shown in the bar
    pub symbol: &'static str,
    /// The arrangement algorithm, or `None` for floating
    pub arrange: Option<ArrangeFn>,
}

/// The built-in layout table: tile, floating, monocle.
pub fn default_layouts() -> Vec<Layout> {
    vec![
        Layout {
            symbol: "[]=",
            arrange: Some(tile),
        },
        Layout {
            symbol: "><>",
            arrange: None,
        },
        Layout {
            symbol: "[M]",
            arrange: Some(monocle),
        },
    ]
}

/// The master/stack tiling layout.
///
/// The first `nmaster` clients split the master column on the left; the rest
/// split the stack column on the right. Column heights are shared equally
/// with the integer remainder drifting to the later rows.
pub fn tile(m: &Monitor, tiled: &[&Client], _n_visible: usize) -> (Option<String>, Vec<(Xid, Rect)>) {
    let n = tiled.len() as u32;
    if n == 0 {
        return (None, Vec::new());
    }

    let mw = if n > m.nmaster {
        if m.nmaster > 0 {
            (m.wrect.w as f32 * m.mfact).round() as u32
        } else {
            0
        }
    } else {
        m.wrect.w
    };

    let mut positions = Vec::with_capacity(tiled.len());
    let (mut my, mut ty) = (0u32, 0u32);

    for (i, c) in tiled.iter().enumerate() {
        let i = i as u32;

        if i < m.nmaster {
            let h = (m.wrect.h - my) / (std::cmp::min(n, m.nmaster) - i);
            let cell = Rect::new(m.wrect.x, m.wrect.y + my as i32, mw, h);
            positions.push((c.id, cell.shrink_by_border(c.bw)));
            my += h;
        } else {
            let h = (m.wrect.h - ty) / (n - i);
            let cell = Rect::new(
                m.wrect.x + mw as i32,
                m.wrect.y + ty as i32,
                m.wrect.w - mw,
                h,
            );
            positions.push((c.id, cell.shrink_by_border(c.bw)));
            ty += h;
        }
    }

    (None, positions)
}

/// The monocle layout: every visible tiled client fills the window area and
/// stacking order decides which is on top. The layout symbol reports the
/// number of visible clients.
pub fn monocle(m: &Monitor, tiled: &[&Client], n_visible: usize) -> (Option<String>, Vec<(Xid, Rect)>) {
    let symbol = if n_visible > 0 {
        Some(format!("[{}]", n_visible))
    } else {
        None
    };

    let positions = tiled
        .iter()
        .map(|c| (c.id, m.wrect.shrink_by_border(c.bw)))
        .collect();

    (symbol, positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use simple_test_case::test_case;

    fn test_monitor(w: u32, h: u32, mfact: f32, nmaster: u32) -> Monitor {
        let mut m = Monitor::new(0, mfact, nmaster, false, true);
        m.mrect = Rect::new(0, 0, w, h);
        m.update_bar_pos(0);

        m
    }

    fn test_clients(n: usize, bw: u32) -> Vec<Client> {
        (0..n)
            .map(|i| {
                let mut c = Client::new(Xid(i as u32 + 1), Rect::new(0, 0, 100, 100), 0, 0);
                c.bw = bw;
                c.tags = 1;

                c
            })
            .collect()
    }

    #[test]
    fn tile_two_clients_splits_at_mfact() {
        let m = test_monitor(1000, 800, 0.55, 1);
        let clients = test_clients(2, 1);
        let refs: Vec<&Client> = clients.iter().collect();

        let (_, positions) = tile(&m, &refs, 2);

        assert_eq!(
            positions,
            vec![
                (Xid(1), Rect::new(0, 0, 548, 798)),
                (Xid(2), Rect::new(550, 0, 448, 798)),
            ]
        );
    }

    #[test]
    fn tile_single_client_fills_the_window_area() {
        let m = test_monitor(1000, 800, 0.55, 1);
        let clients = test_clients(1, 1);
        let refs: Vec<&Client> = clients.iter().collect();

        let (_, positions) = tile(&m, &refs, 1);

        assert_eq!(positions, vec![(Xid(1), Rect::new(0, 0, 998, 798))]);
    }

    #[test]
    fn tile_distributes_the_height_remainder() {
        let m = test_monitor(300, 100, 0.5, 3);
        let clients = test_clients(3, 0);
        let refs: Vec<&Client> = clients.iter().collect();

        let (_, positions) = tile(&m, &refs, 3);

        let heights: Vec<u32> = positions.iter().map(|(_, r)| r.h).collect();
        assert_eq!(heights, vec![33, 33, 34]);
        assert_eq!(heights.iter().sum::<u32>(), 100);
    }

    #[test]
    fn tile_with_zero_nmaster_gives_the_stack_everything() {
        let m = test_monitor(1000, 800, 0.55, 0);
        let clients = test_clients(2, 0);
        let refs: Vec<&Client> = clients.iter().collect();

        let (_, positions) = tile(&m, &refs, 2);

        assert!(positions.iter().all(|(_, r)| r.x == 0 && r.w == 1000));
    }

    #[test_case(0, None; "empty view")]
    #[test_case(3, Some("[3]".to_string()); "three visible")]
    #[test]
    fn monocle_reports_the_visible_count(n_visible: usize, expected: Option<String>) {
        let m = test_monitor(1000, 800, 0.55, 1);
        let clients = test_clients(n_visible, 1);
        let refs: Vec<&Client> = clients.iter().collect();

        let (symbol, positions) = monocle(&m, &refs, n_visible);

        assert_eq!(symbol, expected);
        assert!(positions.iter().all(|(_, r)| *r == Rect::new(0, 0, 998, 798)));
    }

    #[derive(Debug, Clone)]
    struct Params {
        n: usize,
        nmaster: u32,
        mfact: f32,
        bw: u32,
        screen: Rect,
    }

    impl Arbitrary for Params {
        fn arbitrary(g: &mut Gen) -> Self {
            // Screens of at least 100x100 and slim borders so the smallest
            // cells can always hold their own borders
            Params {
                n: usize::arbitrary(g) % 16,
                nmaster: u32::arbitrary(g) % 5,
                mfact: 0.05 + ((u8::arbitrary(g) % 91) as f32) / 100.0,
                bw: u32::arbitrary(g) % 2,
                screen: Rect::new(
                    u8::arbitrary(g) as i32,
                    u8::arbitrary(g) as i32,
                    (u8::arbitrary(g) as u32) + 100,
                    (u8::arbitrary(g) as u32) + 100,
                ),
            }
        }
    }

    fn run_tile(p: &Params) -> (Monitor, Vec<(Xid, Rect)>) {
        let mut m = Monitor::new(0, p.mfact, p.nmaster, false, true);
        m.mrect = p.screen;
        m.update_bar_pos(0);
        let clients = test_clients(p.n, p.bw);
        let refs: Vec<&Client> = clients.iter().collect();
        let (_, positions) = tile(&m, &refs, p.n);

        (m, positions)
    }

    #[quickcheck]
    fn tile_lays_out_every_client(p: Params) -> bool {
        let (_, positions) = run_tile(&p);

        positions.len() == p.n
    }

    #[quickcheck]
    fn tile_keeps_clients_inside_the_window_area(p: Params) -> bool {
        let (m, positions) = run_tile(&p);

        positions.iter().all(|(_, r)| {
            let outer_right = r.x + (r.w + 2 * p.bw) as i32;
            let outer_bottom = r.y + (r.h + 2 * p.bw) as i32;

            r.x >= m.wrect.x
                && r.y >= m.wrect.y
                && outer_right <= m.wrect.right()
                && outer_bottom <= m.wrect.bottom()
        })
    }

    #[quickcheck]
    fn tile_master_and_stack_columns_never_overlap(p: Params) -> bool {
        let (_, positions) = run_tile(&p);
        let n_master = std::cmp::min(p.n, p.nmaster as usize);

        let master_right = positions[..n_master]
            .iter()
            .map(|(_, r)| r.x + (r.w + 2 * p.bw) as i32)
            .max();
        let stack_left = positions[n_master..].iter().map(|(_, r)| r.x).min();

        match (master_right, stack_left) {
            (Some(mr), Some(sl)) => mr <= sl,
            _ => true,
        }
    }
}
