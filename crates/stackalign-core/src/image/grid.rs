use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Generate a grid of continuous indices for a 2D image shape.
///
/// Returns a tensor of shape `[N, 2]` where N is the total number of pixels,
/// with index coordinates ordered `(x, y)` and rows enumerated in row-major
/// `[y, x]` order to match tensor data layout.
///
/// # Arguments
/// * `shape` - The image shape `[H, W]`
/// * `device` - The device to create the tensor on
pub fn generate_grid_2d<B>(shape: [usize; 2], device: &B::Device) -> Tensor<B, 2>
where
    B: Backend,
{
    let h = shape[0];
    let w = shape[1];
    let total = h * w;

    let mut grid = Vec::with_capacity(total * 2);
    for y in 0..h {
        for x in 0..w {
            grid.push(x as f64);
            grid.push(y as f64);
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * 2])), device)
        .reshape([total, 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_grid_2d_ordering() {
        let device = Default::default();
        let grid = generate_grid_2d::<B>([2, 3], &device);
        assert_eq!(grid.dims(), [6, 2]);

        let data = grid.into_data();
        let slice = data.as_slice::<f32>().unwrap();
        // First row of the image: (0,0), (1,0), (2,0)
        assert_eq!(&slice[0..6], &[0.0, 0.0, 1.0, 0.0, 2.0, 0.0]);
        // Second row starts at (0,1)
        assert_eq!(&slice[6..8], &[0.0, 1.0]);
    }
}
