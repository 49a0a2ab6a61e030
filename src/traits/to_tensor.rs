//! Conversion of host-side batches into backend tensors
//!
//! Trajectories are accumulated as plain vectors while an episode runs and
//! only become tensors at update time. These impls cover the two shapes the
//! trainer needs: flat scalar batches and batches of fixed-size rows.

use burn::{
    prelude::*,
    tensor::{backend::Backend, BasicOps, Element, TensorData},
};

/// A trait for converting items to tensors
///
/// Commonly implemented for `Vec<T>` to convert batches of `T` to a tensor
/// of dimension `D`.
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B>> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

impl<B, E, K> ToTensor<B, 1, K> for Vec<E>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 1, K> {
        let len = self.len();
        Tensor::from_data(TensorData::new(self, [len]), device)
    }
}

impl<B, E, K, const A: usize> ToTensor<B, 2, K> for Vec<[E; A]>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2, K> {
        let batch_size = self.len();
        // Pre-allocate exact capacity to avoid reallocation
        let mut flat = Vec::with_capacity(batch_size * A);
        for array in self.iter() {
            flat.extend_from_slice(array);
        }

        let data = TensorData::new(flat, [batch_size, A]);
        Tensor::<B, 2, K>::from_data(data, device)
    }
}
