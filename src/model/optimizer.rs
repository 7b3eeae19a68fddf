use super::constants::{GRADIENT_TOLERANCE, LBFGS_HISTORY, MAX_ITERATIONS};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Stop once the largest projected gradient component is at most this
    pub gradient_tolerance: f64,
    pub max_iterations: usize,
    /// Number of correction pairs kept by the quasi-Newton update
    pub history: usize
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            gradient_tolerance: GRADIENT_TOLERANCE,
            max_iterations: MAX_ITERATIONS,
            history: LBFGS_HISTORY
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: DVector<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool
}

struct Correction {
    s: DVector<f64>,
    y: DVector<f64>,
    rho: f64
}

fn project(x: &DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) -> DVector<f64> {
    x.zip_map(lower, f64::max).zip_map(upper, f64::min)
}

fn projected_gradient_norm(x: &DVector<f64>, g: &DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) -> f64 {
    (project(&(x - g), lower, upper) - x).amax()
}

/// Variables sitting on a bound with the gradient pushing outward are held fixed. The
/// mask is 1 for free variables and 0 for fixed ones.
fn free_mask(x: &DVector<f64>, g: &DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) -> DVector<f64> {
    DVector::from_fn(x.len(), |i, _| {
        let fixed = (x[i] <= lower[i] && g[i] > 0.0) || (x[i] >= upper[i] && g[i] < 0.0);
        if fixed {
            0.0
        } else {
            1.0
        }
    })
}

/// Two-loop recursion restricted to the free variables. Returns the search direction.
fn direction(g: &DVector<f64>, free: &DVector<f64>, history: &VecDeque<Correction>) -> DVector<f64> {
    let mut q = g.component_mul(free);

    let mut alphas = Vec::with_capacity(history.len());
    for c in history.iter().rev() {
        let alpha = c.rho * c.s.dot(&q);
        q.axpy(-alpha, &c.y, 1.0);
        q.component_mul_assign(free);
        alphas.push(alpha);
    }

    let gamma = history.back().map_or(1.0, |c| c.s.dot(&c.y) / c.y.norm_squared());
    let mut r = q * gamma;

    for (c, alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = c.rho * c.y.dot(&r);
        r.axpy(alpha - beta, &c.s, 1.0);
        r.component_mul_assign(free);
    }

    -r
}

/// Projected limited-memory BFGS over the box `[lower, upper]`.
///
/// `objective` returns the value and gradient at a point. The line search backtracks
/// along the projection arc `P(x + t·d)` until the Armijo condition holds. Memory is
/// dropped whenever the quasi-Newton direction stops being a descent direction.
pub fn minimize<F>(
    objective: F,
    x0: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    options: &SolverOptions
) -> Minimum
where
    F: Fn(&DVector<f64>) -> (f64, DVector<f64>)
{
    let mut x = project(x0, lower, upper);

    let (mut fx, mut g) = objective(&x);
    let mut history: VecDeque<Correction> = VecDeque::with_capacity(options.history);
    let mut converged = false;
    let mut iterations = 0;

    while iterations < options.max_iterations {
        if projected_gradient_norm(&x, &g, lower, upper) <= options.gradient_tolerance {
            converged = true;
            break;
        }

        iterations += 1;

        let free = free_mask(&x, &g, lower, upper);
        let mut d = direction(&g, &free, &history);
        if d.dot(&g) >= 0.0 {
            history.clear();
            d = direction(&g, &free, &history);
        }

        let mut t = if history.is_empty() { 1.0_f64.min(1.0 / d.norm().max(f64::EPSILON)) } else { 1.0 };

        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let candidate = project(&(&x + &d * t), lower, upper);

            let step = &candidate - &x;
            let decrease = g.dot(&step);
            if decrease >= 0.0 {
                break;
            }

            let (f_candidate, g_candidate) = objective(&candidate);
            if f_candidate <= fx + ARMIJO * decrease {
                accepted = Some((candidate, step, f_candidate, g_candidate));
                break;
            }

            t *= 0.5;
        }

        match accepted {
            Some((x_next, s, f_next, g_next)) => {
                let y = &g_next - &g;
                let sy = s.dot(&y);

                if sy > f64::EPSILON * y.norm_squared() {
                    if history.len() == options.history.max(1) {
                        history.pop_front();
                    }
                    history.push_back(Correction { s, y, rho: 1.0 / sy });
                }

                x = x_next;
                fx = f_next;
                g = g_next;
            }
            None if !history.is_empty() => history.clear(),
            None => break
        }
    }

    if !converged {
        converged = projected_gradient_norm(&x, &g, lower, upper) <= options.gradient_tolerance;
    }

    Minimum {
        x,
        value: fx,
        iterations,
        converged
    }
}
