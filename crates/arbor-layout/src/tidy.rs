//! Linear-time tidy tree positioning (Reingold–Tilford with Buchheim/Jünger/Leipert's
//! improvements), following the d3-hierarchy `tree()` formulation.
//!
//! Input is an index arena: `children[v]` lists the ordered children of `v`, index `0` is the
//! root. Output is one x-coordinate per node, in separation units, with the root at `0.0`.
//! Depth is implied by the arena and is not computed here.

struct Walker<'a, F> {
    children: &'a [Vec<usize>],
    parent: Vec<Option<usize>>,
    /// Position among siblings.
    number: Vec<usize>,
    prelim: Vec<f64>,
    modifier: Vec<f64>,
    change: Vec<f64>,
    shift: Vec<f64>,
    thread: Vec<Option<usize>>,
    ancestor: Vec<usize>,
    /// Per-parent "default ancestor" carried between sibling apportion calls.
    default_ancestor: Vec<Option<usize>>,
    separation: F,
}

/// Computes tidy x-coordinates for the tree described by `children`.
///
/// `separation(a, b)` returns the minimum horizontal distance, in units, between two nodes that
/// end up adjacent on the same level.
pub fn tidy_x<F>(children: &[Vec<usize>], separation: F) -> Vec<f64>
where
    F: Fn(usize, usize) -> f64,
{
    let n = children.len();
    if n == 0 {
        return Vec::new();
    }

    let mut parent = vec![None; n];
    let mut number = vec![0; n];
    for (v, kids) in children.iter().enumerate() {
        for (i, &c) in kids.iter().enumerate() {
            parent[c] = Some(v);
            number[c] = i;
        }
    }

    let mut walker = Walker {
        children,
        parent,
        number,
        prelim: vec![0.0; n],
        modifier: vec![0.0; n],
        change: vec![0.0; n],
        shift: vec![0.0; n],
        thread: vec![None; n],
        ancestor: (0..n).collect(),
        default_ancestor: vec![None; n],
        separation,
    };

    for v in post_order(children) {
        walker.first_walk(v);
    }

    // The root hangs off a virtual parent whose modifier cancels the root's prelim, which pins
    // the root at x = 0.
    let mut x = vec![0.0; n];
    let root_shift = -walker.prelim[0];
    for v in pre_order(children) {
        let parent_mod = match walker.parent[v] {
            Some(p) => walker.modifier[p],
            None => root_shift,
        };
        x[v] = walker.prelim[v] + parent_mod;
        walker.modifier[v] += parent_mod;
    }
    x
}

fn pre_order(children: &[Vec<usize>]) -> Vec<usize> {
    let mut out = Vec::with_capacity(children.len());
    let mut stack = vec![0usize];
    while let Some(v) = stack.pop() {
        out.push(v);
        stack.extend(children[v].iter().rev().copied());
    }
    out
}

fn post_order(children: &[Vec<usize>]) -> Vec<usize> {
    // Reverse of a root-first walk that visits the right-most child first.
    let mut out = Vec::with_capacity(children.len());
    let mut stack = vec![0usize];
    while let Some(v) = stack.pop() {
        out.push(v);
        stack.extend(children[v].iter().copied());
    }
    out.reverse();
    out
}

impl<F> Walker<'_, F>
where
    F: Fn(usize, usize) -> f64,
{
    fn next_left(&self, v: usize) -> Option<usize> {
        self.children[v].first().copied().or(self.thread[v])
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.children[v].last().copied().or(self.thread[v])
    }

    fn left_sibling(&self, v: usize) -> Option<usize> {
        let p = self.parent[v]?;
        let i = self.number[v];
        if i == 0 {
            return None;
        }
        Some(self.children[p][i - 1])
    }

    fn first_walk(&mut self, v: usize) {
        let w = self.left_sibling(v);
        let children = self.children;
        let kids = &children[v];
        if let (Some(&first), Some(&last)) = (kids.first(), kids.last()) {
            self.execute_shifts(v);
            let midpoint = (self.prelim[first] + self.prelim[last]) / 2.0;
            match w {
                Some(w) => {
                    self.prelim[v] = self.prelim[w] + (self.separation)(v, w);
                    self.modifier[v] = self.prelim[v] - midpoint;
                }
                None => self.prelim[v] = midpoint,
            }
        } else if let Some(w) = w {
            self.prelim[v] = self.prelim[w] + (self.separation)(v, w);
        }

        if let Some(p) = self.parent[v] {
            let default = self.default_ancestor[p].unwrap_or(self.children[p][0]);
            self.default_ancestor[p] = Some(self.apportion(v, w, default));
        }
    }

    fn apportion(&mut self, v: usize, w: Option<usize>, mut default: usize) -> usize {
        let Some(w) = w else {
            return default;
        };
        let Some(p) = self.parent[v] else {
            return default;
        };

        // i/o = inner/outer contour, p/m = plus (v's side) / minus (left siblings' side).
        let mut vip = v;
        let mut vop = v;
        let mut vim = w;
        let mut vom = self.children[p][0];
        let mut sip = self.modifier[vip];
        let mut sop = self.modifier[vop];
        let mut sim = self.modifier[vim];
        let mut som = self.modifier[vom];

        let mut next_im = self.next_right(vim);
        let mut next_ip = self.next_left(vip);
        while let (Some(im), Some(ip)) = (next_im, next_ip) {
            vim = im;
            vip = ip;
            let (Some(om), Some(op)) = (self.next_left(vom), self.next_right(vop)) else {
                break;
            };
            vom = om;
            vop = op;
            self.ancestor[vop] = v;

            let shift =
                self.prelim[vim] + sim - self.prelim[vip] - sip + (self.separation)(vim, vip);
            if shift > 0.0 {
                let wm = self.next_ancestor(vim, v, default);
                self.move_subtree(wm, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.modifier[vim];
            sip += self.modifier[vip];
            som += self.modifier[vom];
            sop += self.modifier[vop];

            next_im = self.next_right(vim);
            next_ip = self.next_left(vip);
        }

        if let Some(im) = next_im {
            if self.next_right(vop).is_none() {
                self.thread[vop] = Some(im);
                self.modifier[vop] += sim - sop;
            }
        }
        if let Some(ip) = next_ip {
            if self.next_left(vom).is_none() {
                self.thread[vom] = Some(ip);
                self.modifier[vom] += sip - som;
                default = v;
            }
        }
        default
    }

    fn next_ancestor(&self, vim: usize, v: usize, default: usize) -> usize {
        let a = self.ancestor[vim];
        if self.parent[a] == self.parent[v] {
            a
        } else {
            default
        }
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let span = self.number[wp].saturating_sub(self.number[wm]).max(1) as f64;
        let change = shift / span;
        self.change[wp] -= change;
        self.shift[wp] += shift;
        self.change[wm] += change;
        self.prelim[wp] += shift;
        self.modifier[wp] += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        for &w in self.children[v].iter().rev() {
            self.prelim[w] += shift;
            self.modifier[w] += shift;
            change += self.change[w];
            shift += self.shift[w] + change;
        }
    }
}
