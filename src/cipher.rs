/// Bytes in one cipher block.
pub const BLOCK_SIZE: usize = 16;

pub type Block = [u8; BLOCK_SIZE];

/// Block cipher used to encrypt the radio link, one 16-byte block at a time.
///
/// The key schedule is set once per link; encryption and decryption work in
/// place.
pub trait BlockCipher {
    fn set_key(&mut self, encrypt_key: &Block, decrypt_key: &Block);
    fn encrypt(&mut self, block: &mut Block);
    fn decrypt(&mut self, block: &mut Block);
}

#[cfg(test)]
mod test {
    use super::*;

    /// Xors with the key, enough to exercise the contract.
    #[derive(Default)]
    struct Xor {
        encrypt: Block,
        decrypt: Block,
    }

    impl BlockCipher for Xor {
        fn set_key(&mut self, encrypt_key: &Block, decrypt_key: &Block) {
            self.encrypt = *encrypt_key;
            self.decrypt = *decrypt_key;
        }

        fn encrypt(&mut self, block: &mut Block) {
            block.iter_mut().zip(&self.encrypt).for_each(|(byte, key)| *byte ^= key);
        }

        fn decrypt(&mut self, block: &mut Block) {
            block.iter_mut().zip(&self.decrypt).for_each(|(byte, key)| *byte ^= key);
        }
    }

    fn seal(cipher: &mut dyn BlockCipher, block: &mut Block) {
        cipher.encrypt(block);
    }

    #[test]
    fn works_in_place_through_a_trait_object() {
        let key = [0x5a; BLOCK_SIZE];
        let mut cipher = Xor::default();
        cipher.set_key(&key, &key);

        let mut block = *b"sixteen byte msg";
        seal(&mut cipher, &mut block);
        assert_ne!(&block, b"sixteen byte msg");
        cipher.decrypt(&mut block);
        assert_eq!(&block, b"sixteen byte msg");
    }
}
