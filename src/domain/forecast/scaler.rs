//! Min-max normalization of close prices.

/// Maps `[min, max]` linearly onto `[0, 1]`.
///
/// A degenerate range (`min == max`) uses a unit scale, so a constant series
/// maps to 0 and inverse-maps back to the constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// `None` unless both bounds are finite and `min <= max`.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        (min.is_finite() && max.is_finite() && min <= max).then_some(Self { min, max })
    }

    /// Fit to the observed range of `values`. `None` for an empty series or
    /// one containing non-finite values.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let mut iter = values.iter().copied();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Self::new(min, max)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn scale(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 { 1.0 } else { range }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.scale()
    }

    pub fn inverse_transform(&self, value: f64) -> f64 {
        value * self.scale() + self.min
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }
}

/// Where the forecast scaler comes from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ScalerPolicy {
    /// Re-fit on every call over the whole supplied close series.
    #[default]
    PerCall,
    /// A scaler persisted from training time.
    Fixed(MinMaxScaler),
}

impl ScalerPolicy {
    pub fn scaler_for(&self, series: &[f64]) -> Option<MinMaxScaler> {
        match self {
            ScalerPolicy::PerCall => MinMaxScaler::fit(series),
            ScalerPolicy::Fixed(scaler) => Some(*scaler),
        }
    }
}
