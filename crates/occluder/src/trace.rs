//! Shadow ray tracing through the occlusion tree.
//!
//! A trace first walks the ray down the tree, collecting the leaves it
//! passes and stopping early at solid space. The collected triangles are
//! then tested, and every contact is resolved in order of depth: filtering
//! surfaces tint the ray, the first opaque surface (or a fully tinted ray)
//! blocks it.

use log::trace;
use occluder_level::CompileFlags;
use occluder_math::{Point3, Ray, Vec3};

use crate::pool::{InfoId, NodeId, TraceInfo};
use crate::tree::{LeafKind, TreeNode};
use crate::triangle::TraceTriangle;
use crate::OcclusionTree;

/// Filter contacts closer than this (relative to depth) on the same info are
/// the same crossing reported by neighbouring triangles.
const SAME_CROSSING: f64 = 1e-6;

/// One shadow query plus its results and per-thread scratch space.
///
/// Reuse a request for many traces to keep its scratch allocations.
#[derive(Debug, Clone)]
pub struct TraceRequest {
    pub origin: Point3,
    pub end: Point3,
    /// Hits closer than this to the origin are ignored.
    pub inhibit_radius: f64,
    /// Receive group of the sample; 0 receives no shadows at all.
    pub recv_shadows: i32,
    /// Level surfaces the sample lies on, for self-shadow suppression. The
    /// first one decides whether the skybox is traced.
    pub surfaces: Vec<usize>,
    pub test_occlusion: bool,
    /// Keep going through solid space and also trace the skybox scene.
    pub test_all: bool,
    /// Light colour; filtered in place.
    pub color: [f64; 3],

    /// Where the ray was stopped, or the origin.
    pub hit: Point3,
    pub opaque: bool,
    /// The ray crossed solid space.
    pub pass_solid: bool,
    /// Compile flags of the surfaces crossed up to the blocker.
    pub flags: CompileFlags,
    /// Ray/triangle tests performed by the last trace.
    pub triangles_tested: usize,

    direction: Vec3,
    distance: f64,
    test_nodes: Vec<NodeId>,
    contacts: Vec<Contact>,
}

impl TraceRequest {
    /// A request from `origin` to `end` with default inputs: receive group
    /// 1, occlusion enabled, white light.
    pub fn new(origin: Point3, end: Point3) -> Self {
        let mut request = Self {
            origin,
            end,
            inhibit_radius: 0.0,
            recv_shadows: 1,
            surfaces: Vec::new(),
            test_occlusion: true,
            test_all: false,
            color: [1.0; 3],
            hit: origin,
            opaque: false,
            pass_solid: false,
            flags: CompileFlags::empty(),
            triangles_tested: 0,
            direction: Vec3::zeros(),
            distance: 0.0,
            test_nodes: Vec::new(),
            contacts: Vec::new(),
        };
        request.set_segment(origin, end);
        request
    }

    pub fn with_inhibit_radius(mut self, radius: f64) -> Self {
        self.inhibit_radius = radius;
        self
    }

    pub fn with_recv_shadows(mut self, group: i32) -> Self {
        self.recv_shadows = group;
        self
    }

    pub fn with_surfaces(mut self, surfaces: Vec<usize>) -> Self {
        self.surfaces = surfaces;
        self
    }

    pub fn with_test_all(mut self, test_all: bool) -> Self {
        self.test_all = test_all;
        self
    }

    pub fn with_color(mut self, color: [f64; 3]) -> Self {
        self.color = color;
        self
    }

    /// Point the request at a new segment.
    pub fn set_segment(&mut self, origin: Point3, end: Point3) {
        self.origin = origin;
        self.end = end;
        let delta = end - origin;
        self.distance = delta.norm();
        self.direction = if self.distance > 0.0 {
            delta / self.distance
        } else {
            Vec3::zeros()
        };
        self.hit = origin;
    }

    /// Unit direction from origin to end.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Point at `depth` along the ray.
    pub fn point_at(&self, depth: f64) -> Point3 {
        self.origin + self.direction * depth
    }

    /// Leaves collected by the last descent.
    pub fn test_nodes(&self) -> &[NodeId] {
        &self.test_nodes
    }

    fn reset(&mut self) {
        self.hit = self.origin;
        self.opaque = false;
        self.pass_solid = false;
        self.flags = CompileFlags::empty();
        self.triangles_tested = 0;
        self.test_nodes.clear();
        self.contacts.clear();
    }
}

/// Outcome of a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Occlusion {
    Unblocked,
    Blocked(Blocker),
}

impl Occlusion {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Occlusion::Blocked(_))
    }
}

/// What stopped a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Blocker {
    /// Solid space between the endpoints.
    Solid,
    /// A surface: opaque, or filtering the light down to nothing.
    Surface { info: InfoId, depth: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ContactKind {
    Sky,
    Opaque,
    Filter([f64; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Contact {
    depth: f64,
    info: InfoId,
    kind: ContactKind,
}

/// A parameter interval `[t0, t1]` along the ray.
type Span = (f64, f64);

/// The part of `span` where `a + b * t >= -eps`.
fn clip_front(span: Span, a: f64, b: f64, eps: f64) -> Option<Span> {
    let (mut t0, mut t1) = span;
    if b == 0.0 {
        return (a >= -eps).then_some(span);
    }
    let t = (-eps - a) / b;
    if b > 0.0 {
        t0 = t0.max(t);
    } else {
        t1 = t1.min(t);
    }
    (t0 <= t1).then_some((t0, t1))
}

/// Whether a surface in cast group `cast` shadows a sample in receive group
/// `recv`.
pub fn shadows_group(recv: i32, cast: i32) -> bool {
    match recv {
        1 => cast == 1,
        r if r > 1 => cast == 1 || cast.abs() == r.abs(),
        r => cast.abs() == r.abs(),
    }
}

impl OcclusionTree {
    /// Trace one shadow ray, filling the request's outputs.
    ///
    /// Blocked rays leave `hit` at the blocking point. Opaque surfaces zero
    /// the colour; filters scale it. With `no_surfaces` set only solid space
    /// can block.
    pub fn trace(&self, req: &mut TraceRequest) -> Occlusion {
        req.reset();
        let e = &self.settings().epsilons;
        if req.recv_shadows == 0 || !req.test_occlusion || req.distance <= e.min_distance {
            return Occlusion::Unblocked;
        }

        self.descend_root(self.head(), req);
        if req.pass_solid && !req.test_all {
            req.opaque = true;
            return Occlusion::Blocked(Blocker::Solid);
        }
        if self.settings().no_surfaces {
            return Occlusion::Unblocked;
        }
        self.test_leaves(req);
        if let Some(blocked) = self.resolve(req) {
            return blocked;
        }

        let through_skybox = req
            .surfaces
            .first()
            .map_or(true, |&s| !self.has_skybox_child(s));
        if req.test_all && req.flags.contains(CompileFlags::SKY) && through_skybox {
            trace!("tracing skybox scene");
            req.test_nodes.clear();
            req.contacts.clear();
            self.descend_root(self.sky(), req);
            self.test_leaves(req);
            if let Some(blocked) = self.resolve(req) {
                return blocked;
            }
        }
        Occlusion::Unblocked
    }

    fn descend_root(&self, root: NodeId, req: &mut TraceRequest) {
        let span = (0.0, req.distance);
        self.descend(root, Some(span), span, req);
    }

    /// Walk the ray down from `node`. `strict` is the part of the segment
    /// still considered to lie in this node for solid-space detection,
    /// `loose` the part used for collecting leaves. Returns true when the
    /// walk must stop.
    fn descend(&self, node: NodeId, strict: Option<Span>, loose: Span, req: &mut TraceRequest) -> bool {
        let settings = self.settings();
        let Some(tree_node) = self.node(node) else {
            if let Some((t0, _)) = strict {
                req.hit = req.point_at(t0);
                req.pass_solid = true;
                return true;
            }
            return false;
        };

        let (plane, children, items) = match tree_node {
            TreeNode::Leaf(leaf) => {
                if leaf.kind == LeafKind::Solid {
                    if let Some((t0, _)) = strict {
                        req.hit = req.point_at(t0);
                        req.pass_solid = true;
                        return true;
                    }
                    return false;
                }
                if !leaf.items.is_empty() && req.test_nodes.len() < settings.max_test_nodes {
                    req.test_nodes.push(node);
                }
                return false;
            }
            TreeNode::Decision {
                plane,
                children,
                items,
                ..
            } => (plane, *children, *items),
        };
        if req.test_all && items == 0 {
            return false;
        }

        let a = plane.distance(&req.origin);
        let b = plane.normal.dot(&req.direction);
        let d = |t: f64| a + b * t;

        // strict halves split at the exact crossing, with a thin on-plane band
        let on = settings.epsilons.trace_on;
        let (strict_front, strict_back) = match strict {
            None => (None, None),
            Some((s0, s1)) => {
                let (f, k) = (d(s0), d(s1));
                if f >= -on && k >= -on {
                    (Some((s0, s1)), None)
                } else if f < on && k < on {
                    (None, Some((s0, s1)))
                } else {
                    let tc = s0 + (s1 - s0) * (f / (f - k));
                    if f < 0.0 {
                        (Some((tc, s1)), Some((s0, tc)))
                    } else {
                        (Some((s0, tc)), Some((tc, s1)))
                    }
                }
            }
        };

        let band = settings.epsilons.on_plane.max(on);
        let loose_front = clip_front(loose, a, b, band);
        let loose_back = clip_front(loose, -a, -b, band);

        let front = (children[0], strict_front, loose_front);
        let back = (children[1], strict_back, loose_back);
        let order = if d(loose.0) < 0.0 {
            [back, front]
        } else {
            [front, back]
        };
        for (child, strict, loose) in order {
            let Some(loose) = loose else {
                continue;
            };
            if self.descend(child, strict, loose, req) {
                return true;
            }
        }
        false
    }

    /// Test the triangles of every collected leaf, recording contacts.
    fn test_leaves(&self, req: &mut TraceRequest) {
        let ray = Ray::new(req.origin, req.direction);
        let nodes = std::mem::take(&mut req.test_nodes);
        let mut nearest = req.distance;

        for &id in &nodes {
            let Some(leaf) = self.node(id).and_then(TreeNode::as_leaf) else {
                continue;
            };
            match ray.intersect_aabb(&leaf.bounds) {
                Some((enter, _)) if enter <= nearest => {}
                _ => continue,
            }
            for &tri in leaf.items.triangles() {
                req.triangles_tested += 1;
                let Some(contact) = self.test_triangle(self.triangle(tri), req) else {
                    continue;
                };
                if contact.kind == ContactKind::Opaque && contact.depth < nearest {
                    nearest = contact.depth;
                }
                req.contacts.push(contact);
            }
        }
        req.test_nodes = nodes;
    }

    fn test_triangle(&self, tri: &TraceTriangle, req: &TraceRequest) -> Option<Contact> {
        let e = &self.settings().epsilons;
        let info: &TraceInfo = self.info(tri.info);
        if !shadows_group(req.recv_shadows, info.cast_shadows) {
            return None;
        }

        let hit = tri.intersect(&req.origin, &req.direction, e.coplanar, e.bary)?;
        if hit.depth <= req.inhibit_radius || hit.depth >= req.distance {
            return None;
        }
        if hit.depth <= e.self_shadow && info.surface.is_some_and(|s| req.surfaces.contains(&s)) {
            return None;
        }

        let contact = |kind| {
            Some(Contact {
                depth: hit.depth,
                info: tri.info,
                kind,
            })
        };
        let flags = info.shader.flags;
        if flags.contains(CompileFlags::SKY) {
            return contact(ContactKind::Sky);
        }
        let Some(image) = info.shader.image.as_ref().filter(|_| flags.is_filter()) else {
            return contact(ContactKind::Opaque);
        };
        if !hit.within(e.seam) {
            return None;
        }

        let st = tri.tex_coords(hit.u, hit.v);
        let Some(texel) = image.sample(st.x, st.y) else {
            return contact(ContactKind::Opaque);
        };
        let mut factor = [1.0; 3];
        if flags.contains(CompileFlags::LIGHTFILTER) {
            for (f, c) in factor.iter_mut().zip(texel) {
                *f *= c as f64 / 255.0;
            }
        }
        if flags.contains(CompileFlags::ALPHASHADOW) {
            let pass = (255 - texel[3]) as f64 / 255.0;
            for f in &mut factor {
                *f *= pass;
            }
        }
        contact(ContactKind::Filter(factor))
    }

    /// Apply contacts nearest first. Returns the occlusion when the ray is
    /// stopped.
    fn resolve(&self, req: &mut TraceRequest) -> Option<Occlusion> {
        let opaque_color = self.settings().epsilons.opaque_color;
        let mut contacts = std::mem::take(&mut req.contacts);
        contacts.sort_by(|a, b| a.depth.total_cmp(&b.depth));

        let mut applied: Vec<(InfoId, f64)> = Vec::new();
        let mut result = None;
        for c in &contacts {
            req.flags |= self.info(c.info).shader.flags;
            let blocked = match c.kind {
                ContactKind::Sky => false,
                ContactKind::Opaque => {
                    req.color = [0.0; 3];
                    true
                }
                ContactKind::Filter(factor) => {
                    let tolerance = SAME_CROSSING * c.depth.max(1.0);
                    if applied
                        .iter()
                        .any(|&(info, depth)| info == c.info && (depth - c.depth).abs() <= tolerance)
                    {
                        continue;
                    }
                    applied.push((c.info, c.depth));
                    for (channel, f) in req.color.iter_mut().zip(factor) {
                        *channel *= f;
                    }
                    req.color.iter().all(|&channel| channel <= opaque_color)
                }
            };
            if blocked {
                req.hit = req.point_at(c.depth);
                req.opaque = true;
                result = Some(Occlusion::Blocked(Blocker::Surface {
                    info: c.info,
                    depth: c.depth,
                }));
                break;
            }
        }

        contacts.clear();
        req.contacts = contacts;
        result
    }

    /// Trace many requests in parallel.
    pub fn trace_all(&self, requests: &mut [TraceRequest]) -> Vec<Occlusion> {
        use rayon::prelude::*;
        requests.par_iter_mut().map(|req| self.trace(req)).collect()
    }
}
