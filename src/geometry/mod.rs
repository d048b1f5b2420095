//! Per-level geometry helpers: spatial index, dissolve, geodesic measures.

use std::f64::consts::PI;

use geo::{BooleanOps, BoundingRect, GeodesicArea, MultiPolygon, Polygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

/// Square metres per square kilometre.
const M2_PER_KM2: f64 = 1_000_000.0;

#[derive(Debug, Clone)]
pub(crate) struct BoundingBox {
    idx: usize, // Index of corresponding MultiPolygon in geoms
    bbox: Rect<f64>,
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// A pair of features whose interiors share area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub a: usize,
    pub b: usize,
    pub area_km2: f64,
}

/// The geometries of one admin level with a bounding-box R-tree.
#[derive(Debug, Clone)]
pub struct PlanarLayer<'a> {
    geoms: &'a [MultiPolygon<f64>],
    rtree: RTree<BoundingBox>,
}

impl<'a> PlanarLayer<'a> {
    /// Index `geoms`; empty geometries have no envelope and are left out.
    pub fn new(geoms: &'a [MultiPolygon<f64>]) -> Self {
        Self {
            rtree: RTree::bulk_load(geoms.iter().enumerate()
                .filter_map(|(idx, poly)| poly.bounding_rect().map(|bbox| BoundingBox { idx, bbox }))
                .collect()),
            geoms,
        }
    }

    #[inline] pub fn len(&self) -> usize { self.geoms.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geoms.is_empty() }

    /// Unordered pairs `(i, j)`, `i < j`, whose bounding boxes intersect.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..self.geoms.len() {
            let Some(rect) = self.geoms[i].bounding_rect() else { continue };
            let search = AABB::from_corners(rect.min().into(), rect.max().into());

            for cand in self.rtree.locate_in_envelope_intersecting(&search) {
                let j = cand.idx;
                if j <= i { continue; } // check each unordered pair once
                pairs.push((i, j));
            }
        }
        pairs.sort_unstable();
        pairs
    }

    /// Pairs whose shared area exceeds `tol_km2`. Pure boundary touches have
    /// zero shared area and are never reported.
    pub fn overlaps(&self, tol_km2: f64) -> Vec<Overlap> {
        self.candidate_pairs().into_iter()
            .filter_map(|(a, b)| {
                let area_km2 = area_km2(&self.geoms[a].intersection(&self.geoms[b]));
                (area_km2 > tol_km2).then_some(Overlap { a, b, area_km2 })
            })
            .collect()
    }

    /// Union of every geometry in the layer.
    pub fn dissolve(&self) -> MultiPolygon<f64> {
        geo::unary_union(self.geoms.iter())
    }
}

/// Geodesic area in km².
#[inline]
pub fn area_km2(mp: &MultiPolygon<f64>) -> f64 {
    mp.geodesic_area_unsigned() / M2_PER_KM2
}

/// Geodesic area of a single polygon in km².
#[inline]
pub fn polygon_area_km2(poly: &Polygon<f64>) -> f64 {
    poly.geodesic_area_unsigned() / M2_PER_KM2
}

/// Isoperimetric ratio `4πA/P²`: 1 for a disc, near 0 for a sliver.
pub fn thinness(poly: &Polygon<f64>) -> f64 {
    let (perimeter, area) = poly.geodesic_perimeter_area_unsigned();
    if perimeter <= 0.0 { return 0.0 }
    4.0 * PI * area / (perimeter * perimeter)
}

/// Interior rings of a dissolved layer, as polygons.
pub fn holes(union: &MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    union.0.iter()
        .flat_map(|poly| poly.interiors().iter().map(|ring| Polygon::new(ring.clone(), Vec::new())))
        .collect()
}

/// Parts of `outer` not covered by `inner`.
pub fn uncovered(outer: &MultiPolygon<f64>, inner: &MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    outer.difference(inner).0
}
